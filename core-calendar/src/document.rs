//! Calendar document codec
//!
//! The remote file holds every event of the calendar. Two layouts are read:
//!
//! - legacy: a bare JSON array of events
//! - versioned: `{"version": 1, "events": [...]}`
//!
//! A document is always written back in the layout it was read in.
//! Content that matches neither layout is rejected; it is never mistaken for
//! an empty calendar.

use bytes::Bytes;
use core_runtime::config::DocumentLayout;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{CalendarError, Result};
use crate::models::CalendarEvent;

/// Highest versioned layout this crate understands.
pub const CURRENT_VERSION: u64 = 1;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, PartialEq)]
pub struct EventDocument {
    pub layout: DocumentLayout,
    pub events: Vec<CalendarEvent>,
}

#[derive(Serialize)]
struct VersionedRef<'a> {
    version: u64,
    events: &'a [CalendarEvent],
}

#[derive(Deserialize)]
struct Versioned {
    events: Vec<CalendarEvent>,
}

impl EventDocument {
    pub fn empty(layout: DocumentLayout) -> Self {
        Self {
            layout,
            events: Vec::new(),
        }
    }

    /// Parse raw document bytes. A leading UTF-8 byte order mark is ignored.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| CalendarError::Decode(format!("not valid JSON: {}", e)))?;

        let document = match value {
            Value::Array(_) => Self {
                layout: DocumentLayout::LegacyArray,
                events: serde_json::from_value(value)
                    .map_err(|e| CalendarError::Decode(format!("invalid event: {}", e)))?,
            },
            Value::Object(_) => {
                let version = value.get("version").and_then(Value::as_u64).ok_or_else(|| {
                    CalendarError::Decode("object document without a numeric version".to_string())
                })?;
                if version != CURRENT_VERSION {
                    return Err(CalendarError::Decode(format!(
                        "unsupported document version {}",
                        version
                    )));
                }

                let versioned: Versioned = serde_json::from_value(value)
                    .map_err(|e| CalendarError::Decode(format!("invalid event: {}", e)))?;
                Self {
                    layout: DocumentLayout::Versioned,
                    events: versioned.events,
                }
            }
            other => {
                return Err(CalendarError::Decode(format!(
                    "expected an array of events, found {}",
                    json_type_name(&other)
                )))
            }
        };

        document.check_unique_ids()?;
        Ok(document)
    }

    /// Serialize in the document's own layout.
    pub fn encode(&self) -> Result<Bytes> {
        let encoded = match self.layout {
            DocumentLayout::LegacyArray => serde_json::to_vec(&self.events),
            DocumentLayout::Versioned => serde_json::to_vec(&VersionedRef {
                version: CURRENT_VERSION,
                events: &self.events,
            }),
        };

        encoded
            .map(Bytes::from)
            .map_err(|e| CalendarError::Storage(format!("failed to encode document: {}", e)))
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.events.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Drop the event with `id`, returning whether one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != id);
        self.events.len() != before
    }

    fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.events.len());
        for event in &self.events {
            if !seen.insert(event.id.as_str()) {
                return Err(CalendarError::Decode(format!(
                    "duplicate event id '{}'",
                    event.id
                )));
            }
        }
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

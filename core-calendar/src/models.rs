//! Domain models for the calendar
//!
//! Events are stored as JSON objects. New dates are written as ISO-8601 UTC
//! timestamps with millisecond precision so that existing web clients can
//! keep reading the document. Dates read from the document keep their exact
//! stored text.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::error::{CalendarError, Result};

/// A single calendar entry as persisted in the remote document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Opaque identifier, unique within the document and never changed
    pub id: String,

    pub title: String,

    pub date: EventDate,

    /// `None` when the stored record has no description field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Fields written by other clients that this version does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CalendarEvent {
    /// Build the record that `add` persists for `input` under `id`.
    pub(crate) fn from_input(id: String, input: EventInput) -> Self {
        Self {
            id,
            title: input.title,
            date: EventDate::from(input.date),
            description: Some(input.description.unwrap_or_default()),
            extra: Map::new(),
        }
    }
}

/// Caller-supplied data for a new event.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use core_calendar::EventInput;
///
/// let input = EventInput::new("Standup", Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap())
///     .with_description("Daily sync")
///     .with_id("8c1b6a8e-6a3f-4f5e-9c1e-1f2a3b4c5d6e");
/// assert!(input.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInput {
    pub title: String,

    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Client-generated id. Reusing the same id when retrying an add makes
    /// the retry idempotent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl EventInput {
    pub fn new(title: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            date,
            description: None,
            id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Check the input before any network call is made.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CalendarError::InvalidEvent(
                "title must not be empty".to_string(),
            ));
        }

        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(CalendarError::InvalidEvent(
                    "id must not be blank when supplied".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// The id this input will be stored under: the supplied one, or a fresh UUID v4.
    pub(crate) fn resolve_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

/// A stored event date.
///
/// Holds the instant for sorting and display along with the text it was read
/// from, which is written back byte for byte. Two dates are equal only when
/// their text matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventDate {
    instant: DateTime<Utc>,
    raw: String,
}

impl EventDate {
    /// Validate stored text, keeping it as is.
    pub fn parse(raw: impl Into<String>) -> std::result::Result<Self, chrono::ParseError> {
        let raw = raw.into();
        let instant = parse_date(&raw)?;
        Ok(Self { instant, raw })
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<DateTime<Utc>> for EventDate {
    fn from(instant: DateTime<Utc>) -> Self {
        Self {
            raw: format_date(&instant),
            instant,
        }
    }
}

impl PartialOrd for EventDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant
            .cmp(&other.instant)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for EventDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for EventDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let instant = parse_date(&raw)
            .map_err(|e| D::Error::custom(format!("invalid date '{}': {}", raw, e)))?;
        Ok(Self { instant, raw })
    }
}

/// Format a timestamp the way it is stored (`2024-01-10T09:00:00.000Z`).
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp and normalise it to UTC.
pub fn parse_date(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|d| d.with_timezone(&Utc))
}

mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw)
            .map_err(|e| D::Error::custom(format!("invalid date '{}': {}", raw, e)))
    }
}

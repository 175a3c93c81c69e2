//! Date arguments
//!
//! Dates without an offset are taken as UTC.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub fn parse(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(date) = core_calendar::models::parse_date(raw) {
        return Ok(date);
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    bail!(
        "Could not parse date '{}'. Use YYYY-MM-DD, YYYY-MM-DDTHH:MM, or RFC 3339.",
        raw
    )
}

//! Timestamp parsing for task records.
//!
//! Records are written both by this service (RFC 3339, millisecond
//! precision, `Z` suffix) and by the external worker, which may emit
//! ISO-8601 timestamps without an offset (`2024-05-01T10:00:00.123456`)
//! or epoch seconds. Naive timestamps are read as UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{ModelError, ModelResult};

/// Formats accepted for timestamps without an offset.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a timestamp string written by either side of the queue.
///
/// # Examples
/// ```
/// use petreel_models::timestamp::parse_timestamp;
/// assert!(parse_timestamp("2024-05-01T10:00:00.000Z").is_ok());
/// assert!(parse_timestamp("2024-05-01T10:00:00.123456").is_ok());
/// assert!(parse_timestamp("yesterday").is_err());
/// ```
pub fn parse_timestamp(ts: &str) -> ModelResult<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(ModelError::InvalidTimestamp(ts.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(ts, fmt) {
            return Ok(naive.and_utc());
        }
    }

    ts.parse::<f64>()
        .ok()
        .and_then(from_epoch_seconds)
        .ok_or_else(|| ModelError::InvalidTimestamp(ts.to_string()))
}

/// Format a timestamp the way the browser client and the worker expect it.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc() as i64;
    let nanos = (secs.fract() * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(whole, nanos)
}

/// Serde adapter for optional timestamps.
///
/// Unparseable values are dropped rather than failing the whole record, so a
/// malformed worker write never makes a task unreadable.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use super::{format_timestamp, from_epoch_seconds, parse_timestamp};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&format_timestamp(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::String(s)) => parse_timestamp(&s).ok(),
            Some(Value::Number(n)) => n.as_f64().and_then(from_epoch_seconds),
            _ => None,
        })
    }
}

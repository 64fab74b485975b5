//! Lenient timestamp decoding.
//!
//! Receipt dates come back as RFC 3339, as zone-less local timestamps, or as
//! plain dates depending on which endpoint produced them. Zone-less values are
//! taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("unrecognised timestamp '{}'", raw))
}

/// `deserialize_with` target for `Option<DateTime<Utc>>` fields.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_datetime(&raw).map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_datetime("2024-03-01T10:00:00+07:00").unwrap();
        assert_eq!(parsed.hour(), 3);
    }

    #[test]
    fn parses_zone_less_timestamp_as_utc() {
        let parsed = parse_datetime("2024-03-01T10:15:30.250").unwrap();
        assert_eq!((parsed.hour(), parsed.minute()), (10, 15));
    }

    #[test]
    fn parses_plain_date() {
        let parsed = parse_datetime("2024-03-01").unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 3, 1));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("yesterday").is_err());
    }
}

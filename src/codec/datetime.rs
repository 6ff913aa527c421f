//! Date/time converter for the JSON wire format
//!
//! Decoding accepts the ISO-8601 round-trip grammar (any fraction length, `Z`,
//! `±hh:mm` or `±hhmm` offsets; no offset means UTC; a bare date means midnight
//! UTC). Encoding always produces `YYYY-MM-DDTHH:mm:ss.fffK`.
//!
//! Use [`WireDateTime`] as a parameter or field type, or annotate a
//! `DateTime<FixedOffset>` field with `#[serde(with = "tower_json_dispatch::codec::datetime")]`.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use serde::{
    de::{self, Expected, Unexpected},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::protocol::error::{DispatchError, DispatchResult};

/// Prefix of every date/time parse failure message
pub(crate) const INVALID_DATE: &str = "Invalid date format";

/// What a date/time field expects, reported with deserialization failures
pub(crate) struct DateTimeExpectation {
    description: &'static str,
}

impl Expected for DateTimeExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description)
    }
}

/// The expectation every date/time deserialization failure is raised against
pub(crate) static DATE_TIME: DateTimeExpectation = DateTimeExpectation {
    description: "an ISO-8601 date/time",
};

/// Check if a deserialization failure came from a date/time field
pub(crate) fn is_date_time(expected: &dyn Expected) -> bool {
    std::ptr::addr_eq(expected, &DATE_TIME)
}

/// Parse an ISO-8601 date/time string
pub fn parse(raw: &str) -> DispatchResult<DateTime<FixedOffset>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc().fixed_offset());
    }
    if let Some(naive) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc().fixed_offset());
    }

    Err(DispatchError::Format(format!("{}: {}", INVALID_DATE, raw)))
}

/// Format a date/time in the canonical wire form
pub fn format(value: &DateTime<FixedOffset>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize a `DateTime<FixedOffset>` in the canonical wire form
pub fn serialize<S>(value: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(value))
}

/// Deserialize a `DateTime<FixedOffset>` from any accepted ISO-8601 form
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|_| de::Error::invalid_value(Unexpected::Str(&raw), &DATE_TIME))
}

/// A date/time that travels in the canonical wire form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireDateTime(pub DateTime<FixedOffset>);

impl From<DateTime<FixedOffset>> for WireDateTime {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self(value)
    }
}

impl fmt::Display for WireDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(&self.0))
    }
}

impl Serialize for WireDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for WireDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize(deserializer).map(WireDateTime)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Timelike, Utc};

    use super::*;

    #[test]
    fn test_format_keeps_offset_and_millis() {
        let dt = DateTime::parse_from_rfc3339("2024-03-05T07:08:09.123+02:00").unwrap();
        assert_eq!(format(&dt), "2024-03-05T07:08:09.123+02:00");
    }

    #[test]
    fn test_format_utc_uses_z() {
        let dt = DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z").unwrap();
        assert_eq!(format(&dt), "2024-03-05T07:08:09.000Z");
    }

    #[test]
    fn test_parse_accepted_forms() {
        let dt = parse("2024-03-05T07:08:09.1234567-05:30").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(dt.nanosecond(), 123_456_700);

        let dt = parse("2024-03-05T07:08:09+0100").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 3600);

        let dt = parse("2024-03-05T07:08:09").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);

        let dt = parse("2024-03-05").unwrap();
        assert_eq!(dt.with_timezone(&Utc).hour(), 0);
    }

    #[test]
    fn test_parse_failure_is_format_error() {
        let err = parse("yesterday").unwrap_err();
        assert!(matches!(err, DispatchError::Format(msg) if msg.contains("yesterday")));
    }

    #[test]
    fn test_wire_date_time_serde() {
        let dt = WireDateTime(parse("2021-12-31T23:59:59.5+09:00").unwrap());
        let json = serde_json::to_string(&dt).unwrap();
        assert_eq!(json, "\"2021-12-31T23:59:59.500+09:00\"");

        let back: WireDateTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dt);
        assert_eq!(back.0.offset(), dt.0.offset());
    }

    #[test]
    fn test_deserialize_failure_names_expectation() {
        let err = serde_json::from_str::<WireDateTime>("\"soon\"").unwrap_err();
        assert!(err.to_string().contains("an ISO-8601 date/time"));
        assert!(is_date_time(&DATE_TIME));
        assert!(!is_date_time(&"an ISO-8601 date/time"));
    }
}

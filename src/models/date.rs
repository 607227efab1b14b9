//! SonarCloud timestamp handling.
//!
//! The API renders timestamps as `2015-02-23T17:58:39+0100`, which is not
//! RFC 3339 (no colon in the offset), so chrono's default serde impls reject
//! it.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serializer};

const SONAR_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Parse a SonarCloud timestamp, accepting RFC 3339 as well.
pub fn parse_sonar_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, SONAR_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
}

/// Render a timestamp the way SonarCloud does.
pub fn format_sonar_date(date: &DateTime<FixedOffset>) -> String {
    date.format(SONAR_FORMAT).to_string()
}

/// Serde adapter for `Option<DateTime<FixedOffset>>` fields.
pub(crate) mod optional {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&format_sonar_date(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) => parse_sonar_date(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sonar_format() {
        let date = parse_sonar_date("2015-02-23T17:58:39+0100").unwrap();
        assert_eq!(date.offset().local_minus_utc(), 3600);
        assert_eq!(format_sonar_date(&date), "2015-02-23T17:58:39+0100");
    }

    #[test]
    fn test_parse_rfc3339() {
        assert!(parse_sonar_date("2024-05-01T10:00:00+00:00").is_some());
        assert!(parse_sonar_date("2024-05-01").is_none());
    }
}

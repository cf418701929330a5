use crate::utils::truncate_to_minute;
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

// Trailing 'Z' marks UTC time. Anything after the pattern (extensions etc.)
// is tolerated, matching how the source listings have named files over time.
static FILENAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^stations_(\d{8}T\d{6})Z").expect("valid filename pattern"));

/// A source-file name of the form `stations_<yyyymmdd>T<hhmmss>Z`, carrying
/// the UTC timestamp embedded in the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileName {
    name: String,
    timestamp: DateTime<Utc>,
}

impl SourceFileName {
    /// Parses a directory entry or link target. Names that do not match the
    /// expected pattern yield `None`; they are not errors, the caller simply
    /// skips them.
    pub fn parse(name: &str) -> Option<Self> {
        let captures = FILENAME_PATTERN.captures(name)?;
        let stamp = NaiveDateTime::parse_from_str(&captures[1], "%Y%m%dT%H%M%S").ok()?;
        Some(Self {
            name: name.to_string(),
            timestamp: stamp.and_utc(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The embedded timestamp truncated to whole minutes; rows loaded from
    /// this file are stamped with this value.
    pub fn minute(&self) -> DateTime<Utc> {
        truncate_to_minute(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_well_formed_name() {
        let file = SourceFileName::parse("stations_20200101T000100Z").unwrap();
        assert_eq!(file.name(), "stations_20200101T000100Z");
        assert_eq!(
            file.timestamp(),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 1, 0).unwrap()
        );
    }

    #[test]
    fn tolerates_trailing_extension() {
        let file = SourceFileName::parse("stations_20200101T000100Z.json").unwrap();
        assert_eq!(
            file.timestamp(),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 1, 0).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(SourceFileName::parse("stations_2020T000100Z").is_none());
        assert!(SourceFileName::parse("station_20200101T000100Z").is_none());
        assert!(SourceFileName::parse("stations_20200101T0001Z").is_none());
        assert!(SourceFileName::parse("index.html").is_none());
        assert!(SourceFileName::parse("../").is_none());
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(SourceFileName::parse("stations_20201301T000000Z").is_none());
        assert!(SourceFileName::parse("stations_20200101T256100Z").is_none());
    }

    #[test]
    fn minute_truncates_seconds() {
        let file = SourceFileName::parse("stations_20200101T000142Z").unwrap();
        assert_eq!(
            file.minute(),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 1, 0).unwrap()
        );
    }
}

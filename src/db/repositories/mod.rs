pub mod cache;
pub mod genre;
pub mod movie;
pub mod relationship;

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width UTC timestamp, so stored values order correctly as text.
#[must_use]
pub fn to_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_as_text() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);

        let a = to_timestamp(earlier);
        let b = to_timestamp(later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_timestamp(&b), Some(later));
    }
}

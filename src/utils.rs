/// Utility functions for time ranges and formatting
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::{Sample, Series, TimeRange};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Format a unix millisecond timestamp the same way, or print the raw number
/// if it is out of range.
pub fn format_timestamp_ms(timestamp_ms: i64) -> String {
    match OffsetDateTime::from_unix_timestamp_nanos(timestamp_ms as i128 * 1_000_000) {
        Ok(dt) => format_datetime(&dt),
        Err(_) => timestamp_ms.to_string(),
    }
}

/// The `window` leading up to `now`, in whole seconds.
pub fn trailing_range(now: OffsetDateTime, window: Duration) -> TimeRange {
    let to = now.unix_timestamp();
    TimeRange::new(to - window.as_secs() as i64, to)
}

/// Most recent point that carries a value.
pub fn last_value(series: &Series) -> Option<&Sample> {
    series.datapoints.iter().rev().find(|p| p.value.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_day_first() {
        let dt = datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(format_datetime(&dt), "05.03.2024 - 07:08:09");
        assert_eq!(format_timestamp_ms(dt.unix_timestamp() * 1000), "05.03.2024 - 07:08:09");
    }

    #[test]
    fn trailing_range_ends_now() {
        let now = datetime!(2024-03-05 12:00 UTC);
        let range = trailing_range(now, Duration::from_secs(3600));
        assert_eq!(range.to, now.unix_timestamp());
        assert_eq!(range.span_secs(), 3600);
    }

    #[test]
    fn last_value_skips_trailing_gaps() {
        let series = Series {
            target: "Living room - temp".to_string(),
            datapoints: vec![Sample::new(21.0, 0), Sample::new(22.5, 1000), Sample::new(None, 2000)],
        };
        assert_eq!(last_value(&series), Some(&Sample::new(22.5, 1000)));
    }
}

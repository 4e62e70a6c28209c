/// Bucket alignment strategies: fixed-width, week-aligned and calendar-month
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::error::{Error, Result};
use crate::models::Resolution;

pub const INTERVAL_1H: i64 = 3_600_000;
pub const INTERVAL_1D: i64 = 86_400_000;
pub const INTERVAL_1W: i64 = 604_800_000;
pub const INTERVAL_4W: i64 = 2_419_200_000;

/// Monday, 5 January 1970, 00:00 UTC.
pub const FIRST_MONDAY_MS: i64 = 345_600_000;

/// A way of cutting the time axis into consecutive buckets.
///
/// `align` maps any timestamp to the start of the bucket that contains it and
/// `next` maps a bucket start to the start of the following bucket. `next`
/// must always move strictly forward.
pub trait IntervalStrategy {
    fn align(&self, timestamp_ms: i64) -> i64;
    fn next(&self, bucket_start_ms: i64) -> i64;
}

/// Buckets of a constant width, aligned to the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidth {
    interval_ms: i64,
}

impl FixedWidth {
    pub fn new(interval_ms: i64) -> Result<Self> {
        if interval_ms <= 0 {
            return Err(Error::Config(format!(
                "Bucket interval must be positive, got {} ms",
                interval_ms
            )));
        }
        Ok(FixedWidth { interval_ms })
    }

    pub const fn hour() -> Self {
        FixedWidth {
            interval_ms: INTERVAL_1H,
        }
    }

    pub const fn day() -> Self {
        FixedWidth {
            interval_ms: INTERVAL_1D,
        }
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }
}

impl IntervalStrategy for FixedWidth {
    fn align(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.interval_ms) * self.interval_ms
    }

    fn next(&self, bucket_start_ms: i64) -> i64 {
        bucket_start_ms + self.interval_ms
    }
}

/// Seven-day buckets anchored on the first Monday after the epoch.
///
/// Plain millisecond arithmetic: no DST or leap-second handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Weekly;

impl IntervalStrategy for Weekly {
    fn align(&self, timestamp_ms: i64) -> i64 {
        (timestamp_ms - FIRST_MONDAY_MS).div_euclid(INTERVAL_1W) * INTERVAL_1W + FIRST_MONDAY_MS
    }

    fn next(&self, bucket_start_ms: i64) -> i64 {
        bucket_start_ms + INTERVAL_1W
    }
}

/// Calendar months in a reference offset. Widths vary between 28 and 31 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monthly {
    offset: UtcOffset,
}

impl Monthly {
    pub fn new(offset: UtcOffset) -> Self {
        Monthly { offset }
    }

    pub fn utc() -> Self {
        Monthly::new(UtcOffset::UTC)
    }

    fn month_start(&self, timestamp_ms: i64) -> Option<OffsetDateTime> {
        let local = OffsetDateTime::from_unix_timestamp_nanos(timestamp_ms as i128 * 1_000_000)
            .ok()?
            .to_offset(self.offset);
        let first = Date::from_calendar_date(local.year(), local.month(), 1).ok()?;
        Some(first.midnight().assume_offset(self.offset))
    }

    fn following_month_start(&self, timestamp_ms: i64) -> Option<OffsetDateTime> {
        let start = self.month_start(timestamp_ms)?;
        let (year, month) = match start.month() {
            Month::December => (start.year() + 1, Month::January),
            month => (start.year(), month.next()),
        };
        let first = Date::from_calendar_date(year, month, 1).ok()?;
        Some(first.midnight().assume_offset(self.offset))
    }
}

impl Default for Monthly {
    fn default() -> Self {
        Monthly::utc()
    }
}

fn to_unix_ms(dt: OffsetDateTime) -> i64 {
    (dt.unix_timestamp_nanos() / 1_000_000) as i64
}

impl IntervalStrategy for Monthly {
    fn align(&self, timestamp_ms: i64) -> i64 {
        // Outside the calendar range `time` supports, leave the timestamp as is
        self.month_start(timestamp_ms)
            .map(to_unix_ms)
            .unwrap_or(timestamp_ms)
    }

    fn next(&self, bucket_start_ms: i64) -> i64 {
        self.following_month_start(bucket_start_ms)
            .map(to_unix_ms)
            .unwrap_or(bucket_start_ms + INTERVAL_4W)
    }
}

/// Any of the supported strategies, chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Fixed(FixedWidth),
    Week(Weekly),
    Month(Monthly),
}

impl Interval {
    /// Strategy used to display a resolution. `Full` means raw points, no bucketing.
    pub fn for_resolution(resolution: Resolution) -> Option<Interval> {
        match resolution {
            Resolution::Full => None,
            Resolution::Hour => Some(Interval::Fixed(FixedWidth::hour())),
            Resolution::Day => Some(Interval::Fixed(FixedWidth::day())),
            Resolution::Week => Some(Interval::Week(Weekly)),
        }
    }
}

impl IntervalStrategy for Interval {
    fn align(&self, timestamp_ms: i64) -> i64 {
        match self {
            Interval::Fixed(s) => s.align(timestamp_ms),
            Interval::Week(s) => s.align(timestamp_ms),
            Interval::Month(s) => s.align(timestamp_ms),
        }
    }

    fn next(&self, bucket_start_ms: i64) -> i64 {
        match self {
            Interval::Fixed(s) => s.next(bucket_start_ms),
            Interval::Week(s) => s.next(bucket_start_ms),
            Interval::Month(s) => s.next(bucket_start_ms),
        }
    }
}

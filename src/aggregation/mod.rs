/// Time-bucketed aggregation of irregular sample sequences
///
/// Samples are regrouped into consecutive buckets produced by an
/// [`IntervalStrategy`]. Buckets without samples are emitted with a `None`
/// value so that the output spans the whole requested range.
pub mod interval;

use log::debug;

use crate::error::{Error, Result};
use crate::models::{Bucket, Sample, TimeRange};

pub use interval::{FixedWidth, Interval, IntervalStrategy, Monthly, Weekly};

/// Sum reducer. Only ever called with at least one value.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Regroup `samples` into buckets over `range`.
///
/// # Arguments
/// * `samples` - readings sorted by timestamp, ascending
/// * `range` - query window; output starts at the bucket containing `range.from`
///   and ends with the bucket containing `range.to`
/// * `strategy` - bucket alignment
/// * `reducer` - combines the non-null values of one bucket
///
/// # Returns
/// The bucketed series, or `UnsortedSamples` if a sample falls in an earlier
/// bucket than the sample before it.
///
/// Empty input yields an empty output, without gap-filling the range.
/// Samples in buckets before `range.from` are dropped. Null values are kept
/// out of the reducer; a bucket holding only nulls is `None`, same as an
/// empty one.
pub fn group_by_time<S, F>(
    samples: &[Sample],
    range: &TimeRange,
    strategy: &S,
    reducer: F,
) -> Result<Vec<Bucket>>
where
    S: IntervalStrategy + ?Sized,
    F: Fn(&[f64]) -> f64,
{
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let time_to = range.end_ms();
    let close = |values: &[f64], start: i64| {
        let value = if values.is_empty() {
            None
        } else {
            Some(reducer(values))
        };
        Bucket::new(value, start)
    };

    let mut grouped = Vec::new();
    let mut frame_values: Vec<f64> = Vec::new();
    let mut frame_ts = strategy.align(range.start_ms());
    let mut previous_frame: Option<i64> = None;
    let mut dropped = 0usize;

    for sample in samples {
        let point_frame = strategy.align(sample.timestamp_ms);

        if let Some(previous) = previous_frame {
            if point_frame < previous {
                return Err(Error::UnsortedSamples {
                    previous,
                    current: point_frame,
                });
            }
        }
        previous_frame = Some(point_frame);

        if point_frame < frame_ts {
            dropped += 1;
            continue;
        }

        if point_frame > frame_ts {
            grouped.push(close(&frame_values, frame_ts));

            // Move the frame up to the sample's bucket, filling skipped buckets with None
            frame_ts = strategy.next(frame_ts);
            while frame_ts < point_frame {
                grouped.push(Bucket::new(None, frame_ts));
                frame_ts = strategy.next(frame_ts);
            }
            frame_values.clear();
        }

        frame_values.extend(sample.value);
    }

    grouped.push(close(&frame_values, frame_ts));

    // Fill up to the end of the range
    frame_ts = strategy.next(frame_ts);
    while frame_ts <= time_to {
        grouped.push(Bucket::new(None, frame_ts));
        frame_ts = strategy.next(frame_ts);
    }

    if dropped > 0 {
        debug!("Dropped {} samples before range start {}", dropped, range.from);
    }

    Ok(grouped)
}

/// Sum samples into fixed-width buckets of `interval_ms`.
pub fn group_by_sum(samples: &[Sample], range: &TimeRange, interval_ms: i64) -> Result<Vec<Bucket>> {
    let strategy = FixedWidth::new(interval_ms)?;
    group_by_time(samples, range, &strategy, sum)
}

/// Sum samples into Monday-aligned weeks.
pub fn group_by_week_sum(samples: &[Sample], range: &TimeRange) -> Result<Vec<Bucket>> {
    group_by_time(samples, range, &Weekly, sum)
}

/// Sum samples into UTC calendar months.
pub fn group_by_month_sum(samples: &[Sample], range: &TimeRange) -> Result<Vec<Bucket>> {
    group_by_time(samples, range, &Monthly::utc(), sum)
}

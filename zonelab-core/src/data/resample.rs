//! Fixed-width timeframe resampling.
//!
//! Buckets are aligned to the Unix epoch. Each output bar aggregates the
//! input bars whose timestamps fall in `[start, start + width)`:
//! open = first open, high = max high, low = min low, close = last close,
//! volume = sum (absent if any input bar lacks volume). Empty buckets are
//! not emitted.

use chrono::{DateTime, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::DataError;

/// Which instant labels an output bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketLabel {
    /// Bucket open time. A bar labeled 10:00 contains data up to 10:59,
    /// so consumers at 10:05 would see the future.
    Start,
    /// Bucket close time. A bar labeled 11:00 is complete at 11:00.
    #[default]
    End,
}

fn bucket_start(ts: NaiveDateTime, width_secs: i64) -> NaiveDateTime {
    let secs = ts.and_utc().timestamp();
    let start = secs.div_euclid(width_secs) * width_secs;
    DateTime::from_timestamp(start, 0)
        .map(|d| d.naive_utc())
        .unwrap_or(ts)
}

/// Aggregate `bars` (ordered by timestamp) into `minutes`-wide bars.
pub fn resample(bars: &[Bar], minutes: u32, label: BucketLabel) -> Result<Vec<Bar>, DataError> {
    if minutes == 0 {
        return Err(DataError::InvalidResampleWidth);
    }
    let width = Duration::minutes(i64::from(minutes));
    let width_secs = width.num_seconds();

    let mut out: Vec<Bar> = Vec::new();
    let mut current: Option<(NaiveDateTime, Bar)> = None;

    for bar in bars {
        let start = bucket_start(bar.timestamp, width_secs);
        match current.as_mut() {
            Some((s, agg)) if *s == start => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume = agg.volume.zip(bar.volume).map(|(a, b)| a + b);
            }
            _ => {
                if let Some((_, done)) = current.take() {
                    out.push(done);
                }
                let labeled = match label {
                    BucketLabel::Start => start,
                    BucketLabel::End => start + width,
                };
                let mut first = bar.clone();
                first.timestamp = labeled;
                current = Some((start, first));
            }
        }
    }
    if let Some((_, done)) = current {
        out.push(done);
    }
    Ok(out)
}

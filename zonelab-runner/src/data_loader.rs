//! Bar loading for the runner.
//!
//! CSV files are read header-first. Required columns: `timestamp`, `open`,
//! `high`, `low`, `close`. Volume is read from `volume`, or from
//! `tick_volume` when only that exists. Header names are matched
//! case-insensitively. Timestamps may be RFC 3339, `YYYY-MM-DD HH:MM[:SS]`
//! (also with a `T` separator) or Unix seconds.
//!
//! Rows are filtered to the requested date range, sorted by timestamp and
//! validated before they reach the engine.
//!
//! Synthetic data is a developer-only mode. Results produced on synthetic
//! data are tagged as such in the run report.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use thiserror::Error;

use zonelab_core::data::validate_series;
use zonelab_core::domain::Bar;
use zonelab_core::error::DataError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: unparseable timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: column '{column}' is not a number: '{value}'")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("no bars in the requested range")]
    NoBarsInRange,

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Optional inclusive date range applied while loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl LoadOptions {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Loaded bars with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    /// BLAKE3 over every timestamp and OHLCV value.
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Rows dropped by the date filter.
    pub rows_filtered: usize,
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &'static str| find(name).ok_or(LoadError::MissingColumn(name));
        Ok(Self {
            timestamp: find("timestamp")
                .or_else(|| find("time"))
                .or_else(|| find("datetime"))
                .ok_or(LoadError::MissingColumn("timestamp"))?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume").or_else(|| find("tick_volume")),
        })
    }
}

/// Load bars from a CSV file.
pub fn load_csv(path: &Path, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = read_bars(file, opts)?;
    tracing::info!(
        path = %path.display(),
        bars = loaded.bars.len(),
        filtered = loaded.rows_filtered,
        "loaded bars"
    );
    Ok(loaded)
}

/// Parse bars from any CSV source.
pub fn read_bars<R: Read>(reader: R, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let cols = Columns::resolve(rdr.headers()?)?;

    let mut bars = Vec::new();
    let mut rows_filtered = 0;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let ts_raw = field(cols.timestamp);
        let timestamp = parse_timestamp(ts_raw).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: ts_raw.to_string(),
        })?;
        if !opts.contains(timestamp.date()) {
            rows_filtered += 1;
            continue;
        }

        let number = |idx: usize, column: &'static str| -> Result<f64, LoadError> {
            let raw = field(idx);
            raw.parse::<f64>().map_err(|_| LoadError::BadNumber {
                row,
                column,
                value: raw.to_string(),
            })
        };
        let mut bar = Bar::new(
            timestamp,
            number(cols.open, "open")?,
            number(cols.high, "high")?,
            number(cols.low, "low")?,
            number(cols.close, "close")?,
        );
        if let Some(idx) = cols.volume {
            if !field(idx).is_empty() {
                bar.volume = Some(number(idx, "volume")?);
            }
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::NoBarsInRange);
    }
    if !bars.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        tracing::warn!("bar file is not in timestamp order, sorting");
        bars.sort_by_key(|b| b.timestamp);
    }
    validate_series(&bars)?;

    Ok(LoadedData {
        dataset_hash: dataset_hash(&bars),
        bars,
        has_synthetic: false,
        rows_filtered,
    })
}

/// Parse the timestamp formats accepted in bar files.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    const FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y.%m.%d %H:%M",
    ];
    if let Some(ts) = FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
    {
        return Some(ts);
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
}

/// Deterministic BLAKE3 hash over all bar data.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.unwrap_or(-1.0).to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Synthetic 5-minute bars for offline development.
///
/// A random walk seeded from the instrument name, so the same instrument
/// always gets the same series. Weekends are skipped. Quiet stretches are
/// interrupted by occasional impulse legs so that zones actually form.
pub fn generate_synthetic_bars(instrument: &str, start: NaiveDate, days: u32) -> LoadedData {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(instrument.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut impulse_left = 0_u32;
    let mut impulse_dir = 1.0_f64;

    for day in 0..days {
        let date = start + Duration::days(i64::from(day));
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
            continue;
        };
        for slot in 0..288 {
            if impulse_left == 0 && rng.gen_bool(0.01) {
                impulse_left = rng.gen_range(3..6);
                impulse_dir = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            }
            let drift = if impulse_left > 0 {
                impulse_left -= 1;
                impulse_dir * rng.gen_range(0.002..0.004)
            } else {
                rng.gen_range(-0.0006..0.0006)
            };
            let open = price;
            let close = price * (1.0 + drift);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0004));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0004));
            bars.push(
                Bar::new(midnight + Duration::minutes(5 * slot), open, high, low, close)
                    .with_volume(f64::from(rng.gen_range(50_u32..500))),
            );
            price = close;
        }
    }

    tracing::warn!(instrument, bars = bars.len(), "using synthetic bars");
    LoadedData {
        dataset_hash: dataset_hash(&bars),
        bars,
        has_synthetic: true,
        rows_filtered: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
timestamp,open,high,low,close,tick_volume
2024-01-02 00:00:00,1.1000,1.1010,1.0990,1.1005,120
2024-01-02 00:05:00,1.1005,1.1012,1.1001,1.1008,95
2024-01-03 00:00:00,1.1008,1.1020,1.1000,1.1015,130
";

    #[test]
    fn reads_tick_volume_as_volume() {
        let loaded = read_bars(SAMPLE.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(loaded.bars.len(), 3);
        assert_eq!(loaded.bars[0].volume, Some(120.0));
        assert!(!loaded.has_synthetic);
        assert_eq!(loaded.dataset_hash.len(), 64);
    }

    #[test]
    fn date_range_is_inclusive() {
        let opts = LoadOptions {
            start: NaiveDate::from_ymd_opt(2024, 1, 2),
            end: NaiveDate::from_ymd_opt(2024, 1, 2),
        };
        let loaded = read_bars(SAMPLE.as_bytes(), &opts).unwrap();
        assert_eq!(loaded.bars.len(), 2);
        assert_eq!(loaded.rows_filtered, 1);
    }

    #[test]
    fn empty_range_is_an_error() {
        let opts = LoadOptions {
            start: NaiveDate::from_ymd_opt(2025, 1, 1),
            end: None,
        };
        assert!(matches!(
            read_bars(SAMPLE.as_bytes(), &opts),
            Err(LoadError::NoBarsInRange)
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "timestamp,open,high,close\n2024-01-02 00:00,1,2,1.5\n";
        assert!(matches!(
            read_bars(csv.as_bytes(), &LoadOptions::default()),
            Err(LoadError::MissingColumn("low"))
        ));
    }

    #[test]
    fn unsorted_rows_are_sorted() {
        let csv = "\
Timestamp,Open,High,Low,Close
2024-01-02 00:05,2,3,1,2
2024-01-02 00:00,1,2,0.5,1.5
";
        let loaded = read_bars(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert!(loaded.bars[0].timestamp < loaded.bars[1].timestamp);
        assert_eq!(loaded.bars[0].volume, None);
    }

    #[test]
    fn duplicate_timestamps_fail_validation() {
        let csv = "\
timestamp,open,high,low,close
2024-01-02 00:00,1,2,0.5,1.5
2024-01-02 00:00,1,2,0.5,1.5
";
        assert!(matches!(
            read_bars(csv.as_bytes(), &LoadOptions::default()),
            Err(LoadError::Data(DataError::NonMonotonic { .. }))
        ));
    }

    #[test]
    fn bad_number_names_row_and_column() {
        let csv = "timestamp,open,high,low,close\n2024-01-02 00:00,1,x,0.5,1.5\n";
        match read_bars(csv.as_bytes(), &LoadOptions::default()) {
            Err(LoadError::BadNumber { row, column, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "high");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 5, 0)
            .unwrap();
        for raw in [
            "2024-01-02 10:05:00",
            "2024-01-02 10:05",
            "2024-01-02T10:05:00",
            "2024-01-02T10:05:00Z",
            "2024-01-02T12:05:00+02:00",
            "1704189900",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "format {raw}");
        }
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn synthetic_data_is_deterministic_and_valid() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = generate_synthetic_bars("EURUSD", start, 7);
        let b = generate_synthetic_bars("EURUSD", start, 7);
        let c = generate_synthetic_bars("XAUUSD", start, 7);
        assert!(a.has_synthetic);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_ne!(a.dataset_hash, c.dataset_hash);
        // 2024-01-01 is a Monday: five weekdays of 288 bars
        assert_eq!(a.bars.len(), 5 * 288);
        assert!(validate_series(&a.bars).is_ok());
    }
}

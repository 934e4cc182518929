//! Bar loading, cleaning and splitting.
//!
//! The input is a CSV export with a unix-seconds `Timestamp` (or `timestamp`)
//! column and `Open,High,Low,Close` columns, optionally `Volume`. Cleaning:
//! 1. Rows with a missing or non-numeric field are dropped
//! 2. Duplicate timestamps keep the first occurrence
//! 3. The remaining rows must be strictly increasing in time
//!
//! Synthetic bars are a developer-only debug mode for running without data.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crossbot_core::domain::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("no usable rows after cleaning")]
    Empty,

    #[error("row {row} timestamp {timestamp} is earlier than the previous row")]
    OutOfOrder { row: usize, timestamp: i64 },
}

/// Cleaned bars plus provenance for artifacts.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    /// Data rows in the file, before cleaning.
    pub rows_read: usize,
    pub dropped_incomplete: usize,
    pub dropped_duplicates: usize,
    /// BLAKE3 over the cleaned bars.
    pub dataset_hash: String,
    pub synthetic: bool,
}

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
            timestamp: require("timestamp")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }
}

/// Load and clean bars from a CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<LoadedData, LoadError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let loaded = load_csv_reader(file)?;
    tracing::info!(
        path = %path.display(),
        rows = loaded.rows_read,
        bars = loaded.bars.len(),
        dropped_incomplete = loaded.dropped_incomplete,
        dropped_duplicates = loaded.dropped_duplicates,
        "loaded bars"
    );
    Ok(loaded)
}

/// Load and clean bars from any CSV source.
pub fn load_csv_reader<R: Read>(reader: R) -> Result<LoadedData, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = Columns::resolve(rdr.headers()?)?;

    let mut bars: Vec<Bar> = Vec::new();
    let mut seen = HashSet::new();
    let mut rows_read = 0;
    let mut dropped_incomplete = 0;
    let mut dropped_duplicates = 0;

    for record in rdr.records() {
        let record = record?;
        rows_read += 1;

        let Some((secs, bar)) = parse_row(&record, &columns) else {
            dropped_incomplete += 1;
            continue;
        };
        if !seen.insert(secs) {
            dropped_duplicates += 1;
            continue;
        }
        if let Some(prev) = bars.last() {
            if bar.timestamp <= prev.timestamp {
                return Err(LoadError::OutOfOrder {
                    row: rows_read,
                    timestamp: secs,
                });
            }
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }

    Ok(LoadedData {
        dataset_hash: dataset_hash(&bars),
        bars,
        rows_read,
        dropped_incomplete,
        dropped_duplicates,
        synthetic: false,
    })
}

fn parse_row(record: &csv::StringRecord, columns: &Columns) -> Option<(i64, Bar)> {
    let field = |idx: usize| -> Option<f64> {
        let value: f64 = record.get(idx)?.parse().ok()?;
        value.is_finite().then_some(value)
    };

    // Exports often write the timestamp as a float ("1325317920.0").
    let secs = field(columns.timestamp)?.trunc() as i64;
    let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)?;
    let bar = Bar::new(
        timestamp,
        field(columns.open)?,
        field(columns.high)?,
        field(columns.low)?,
        field(columns.close)?,
        match columns.volume {
            Some(idx) => field(idx)?,
            None => 0.0,
        },
    );
    Some((secs, bar))
}

/// Write bars in the layout `load_csv` reads.
pub fn write_csv(bars: &[Bar], path: impl AsRef<Path>) -> Result<(), LoadError> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Timestamp", "Open", "High", "Low", "Close", "Volume"])?;
    for bar in bars {
        wtr.write_record([
            bar.timestamp.timestamp().to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Split into (test, validation) at `floor(len * ratio)`.
pub fn split(bars: &[Bar], ratio: f64) -> (&[Bar], &[Bar]) {
    let at = ((bars.len() as f64) * ratio.clamp(0.0, 1.0)).floor() as usize;
    bars.split_at(at.min(bars.len()))
}

/// BLAKE3 over timestamp and OHLCV of every bar.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp().to_le_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(&value.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Deterministic random-walk bars seeded from `label`.
pub fn generate_synthetic_bars(
    label: &str,
    count: usize,
    start: DateTime<Utc>,
    interval: Duration,
) -> LoadedData {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(label.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut timestamp = start;

    for _ in 0..count {
        let step: f64 = rng.gen_range(-0.01..0.01);
        let open = price;
        let close = (price * (1.0 + step)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.003));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.003));
        let volume = rng.gen_range(1.0..50.0);

        bars.push(Bar::new(timestamp, open, high, low, close, volume));
        price = close;
        timestamp += interval;
    }

    tracing::info!(label, bars = bars.len(), "generated synthetic bars");

    LoadedData {
        dataset_hash: dataset_hash(&bars),
        rows_read: bars.len(),
        bars,
        dropped_incomplete: 0,
        dropped_duplicates: 0,
        synthetic: true,
    }
}

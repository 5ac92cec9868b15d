//! Bar loading for the runner.
//!
//! Bars come from an explicitly constructed [`BarSource`]. The CSV source
//! reads `timestamp,open,high,low,close,volume[,is_closed]` rows, accepts
//! epoch milliseconds or RFC 3339 timestamps, and sorts rows ascending.
//! Duplicate timestamps survive loading and are rejected by validation.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use supertrend_core::Bar;
use thiserror::Error;
use tracing::debug;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unparseable timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("no bars in {source_name}")]
    Empty { source_name: String },
}

/// Anything that can produce a bar sequence for a symbol.
pub trait BarSource {
    fn load(&self, symbol: &str) -> Result<Vec<Bar>, LoadError>;
}

/// Bars from a single CSV file.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    path: PathBuf,
}

impl CsvBarSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BarSource for CsvBarSource {
    fn load(&self, symbol: &str) -> Result<Vec<Bar>, LoadError> {
        let file = File::open(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let bars = read_bars(file)?;
        if bars.is_empty() {
            return Err(LoadError::Empty {
                source_name: self.path.display().to_string(),
            });
        }
        debug!(
            symbol,
            path = %self.path.display(),
            bars = bars.len(),
            "bars loaded"
        );
        Ok(bars)
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    is_closed: Option<bool>,
}

/// Parse bars from any CSV reader with a header row. Output is sorted by
/// timestamp; an empty input yields an empty vector.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for (row, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let record = record?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| LoadError::Timestamp {
            row,
            value: record.timestamp.clone(),
        })?;
        bars.push(Bar {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
            is_closed: record.is_closed.unwrap_or(true),
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Epoch milliseconds or RFC 3339.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    match value.parse::<i64>() {
        Ok(ms) => Utc.timestamp_millis_opt(ms).single(),
        Err(_) => DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Flag the last bar as still forming if its period has not elapsed at `now`.
///
/// The bar period is the spacing of the final two bars, or one day when
/// there is only one bar. Returns whether a bar was flagged.
pub fn mark_forming_bar(bars: &mut [Bar], now: DateTime<Utc>) -> bool {
    let interval = match &*bars {
        [.., prev, last] => last.timestamp - prev.timestamp,
        _ => Duration::days(1),
    };
    match bars.last_mut() {
        Some(last) if now < last.timestamp + interval => {
            last.is_closed = false;
            true
        }
        _ => false,
    }
}

/// Deterministic BLAKE3 hash over timestamps and OHLCV values.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
        hasher.update(&[u8::from(bar.is_closed)]);
    }
    hasher.finalize().to_hex().to_string()
}

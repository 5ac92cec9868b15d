//! Bar: the fundamental market data unit, plus boundary validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single instrument over one period.
///
/// `is_closed` is false only for a period that is still forming (the live
/// candle of an exchange feed). Serialized data without the flag is treated
/// as finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default = "default_closed")]
    pub is_closed: bool,
}

fn default_closed() -> bool {
    true
}

impl Bar {
    /// Returns true if every OHLCV field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// Midpoint of the bar's range, (high + low) / 2.
    pub fn mid(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Input rejected at the core boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar sequence is empty")]
    Empty,

    #[error("timestamps not strictly increasing at bar {index}: {previous} then {current}")]
    NonMonotonicTimestamps {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("bar {index} is still forming; opt in to include a forming trailing bar")]
    FormingBar { index: usize },
}

/// Whether a trailing, still-forming bar may take part in a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormingBarPolicy {
    #[default]
    Reject,
    Include,
}

/// Outcome of a successful validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarSummary {
    pub len: usize,
    /// True when the last bar is still forming and the caller opted in.
    pub includes_forming_bar: bool,
}

/// Validate a bar sequence before any indicator work.
///
/// Checks, in bar order: finite OHLCV, `high >= low`, strictly increasing
/// timestamps, and that only the last bar may be unfinished.
pub fn validate_bars(bars: &[Bar], policy: FormingBarPolicy) -> Result<BarSummary, BarError> {
    if bars.is_empty() {
        return Err(BarError::Empty);
    }

    let last = bars.len() - 1;
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_finite() {
            return Err(BarError::InvalidBar {
                index,
                reason: "non-finite OHLCV value".into(),
            });
        }
        if bar.high < bar.low {
            return Err(BarError::InvalidBar {
                index,
                reason: format!("high {} below low {}", bar.high, bar.low),
            });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(BarError::NonMonotonicTimestamps {
                    index,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
        if !bar.is_closed && index != last {
            return Err(BarError::InvalidBar {
                index,
                reason: "only the last bar may still be forming".into(),
            });
        }
    }

    let includes_forming_bar = !bars[last].is_closed;
    if includes_forming_bar && policy == FormingBarPolicy::Reject {
        return Err(BarError::FormingBar { index: last });
    }

    Ok(BarSummary {
        len: bars.len(),
        includes_forming_bar,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar(day: u32) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
            is_closed: true,
        }
    }

    #[test]
    fn accepts_ordered_closed_bars() {
        let bars = vec![sample_bar(1), sample_bar(2), sample_bar(3)];
        let summary = validate_bars(&bars, FormingBarPolicy::Reject).unwrap();
        assert_eq!(summary.len, 3);
        assert!(!summary.includes_forming_bar);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(
            validate_bars(&[], FormingBarPolicy::Include),
            Err(BarError::Empty)
        );
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let bars = vec![sample_bar(1), sample_bar(2), sample_bar(2)];
        let err = validate_bars(&bars, FormingBarPolicy::Reject).unwrap_err();
        assert!(matches!(err, BarError::NonMonotonicTimestamps { index: 2, .. }));
    }

    #[test]
    fn rejects_out_of_order_timestamp() {
        let bars = vec![sample_bar(3), sample_bar(2)];
        let err = validate_bars(&bars, FormingBarPolicy::Reject).unwrap_err();
        assert!(matches!(err, BarError::NonMonotonicTimestamps { index: 1, .. }));
    }

    #[test]
    fn rejects_nan_close() {
        let mut bars = vec![sample_bar(1), sample_bar(2)];
        bars[1].close = f64::NAN;
        let err = validate_bars(&bars, FormingBarPolicy::Reject).unwrap_err();
        assert!(matches!(err, BarError::InvalidBar { index: 1, .. }));
    }

    #[test]
    fn rejects_infinite_high() {
        let mut bars = vec![sample_bar(1)];
        bars[0].high = f64::INFINITY;
        assert!(validate_bars(&bars, FormingBarPolicy::Reject).is_err());
    }

    #[test]
    fn rejects_high_below_low() {
        let mut bars = vec![sample_bar(1)];
        bars[0].high = 97.0;
        let err = validate_bars(&bars, FormingBarPolicy::Reject).unwrap_err();
        assert!(matches!(err, BarError::InvalidBar { index: 0, .. }));
    }

    #[test]
    fn forming_trailing_bar_requires_opt_in() {
        let mut bars = vec![sample_bar(1), sample_bar(2)];
        bars[1].is_closed = false;

        let err = validate_bars(&bars, FormingBarPolicy::Reject).unwrap_err();
        assert_eq!(err, BarError::FormingBar { index: 1 });

        let summary = validate_bars(&bars, FormingBarPolicy::Include).unwrap();
        assert!(summary.includes_forming_bar);
    }

    #[test]
    fn forming_bar_in_the_middle_is_invalid() {
        let mut bars = vec![sample_bar(1), sample_bar(2), sample_bar(3)];
        bars[1].is_closed = false;
        let err = validate_bars(&bars, FormingBarPolicy::Include).unwrap_err();
        assert!(matches!(err, BarError::InvalidBar { index: 1, .. }));
    }

    #[test]
    fn missing_closed_flag_deserializes_as_closed() {
        let json = r#"{"timestamp":"2024-01-02T00:00:00Z","open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert!(bar.is_closed);
        assert_eq!(bar.mid(), 1.25);
    }
}

//! Indicator implementations: range estimation and Supertrend bands.
//!
//! Both are pure functions of the bar history. No value at bar t depends on
//! data from bar t+1 or later.

pub mod range;
pub mod supertrend;

use thiserror::Error;

pub use range::{true_range, RangeEstimator, RangeSeries, RangeSmoothing};
pub use supertrend::{BandEngine, BandSeries, BandState, Supertrend, SupertrendOutput};

/// Errors from indicator construction and evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("period must be >= 1, got {0}")]
    InvalidPeriod(usize),

    #[error("multiplier must be finite and > 0, got {0}")]
    InvalidMultiplier(f64),

    #[error("insufficient history at bar {index}: period {period} needs {period} bars, {available} available")]
    InsufficientHistory {
        period: usize,
        available: usize,
        index: usize,
    },

    #[error("index {index} out of range for series of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("bar count {bars} does not match range series length {range}")]
    LengthMismatch { bars: usize, range: usize },
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLCV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_bars(&data)
}

/// Create daily bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| crate::domain::Bar {
            timestamp: base + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            is_closed: true,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

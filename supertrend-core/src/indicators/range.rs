//! Range estimator: smoothed true range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |prev_close-low|), with
//! TR[0] = high[0] - low[0].
//! Smoothing is either a simple rolling mean or an exponential weighting with
//! alpha = 1/period. Both are defined from index period-1 onward; earlier
//! values are `None`.

use serde::{Deserialize, Serialize};

use super::IndicatorError;
use crate::domain::Bar;

/// How true range is smoothed into a range estimate.
///
/// The two modes give different numbers from identical input. There is no
/// `Default`; callers choose one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSmoothing {
    /// Equal-weight mean of the last `period` true ranges.
    Simple,
    /// Exponentially weighted mean, alpha = 1/period, at least `period` observations.
    Exponential,
}

/// Compute the True Range series from bars.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high - bar.low;
            match i {
                0 => hl,
                _ => {
                    let pc = bars[i - 1].close;
                    hl.max((bar.high - pc).abs()).max((pc - bar.low).abs())
                }
            }
        })
        .collect()
}

/// Rolling mean over a fixed window. `None` until the window is full.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        result[i] = Some(sum / period as f64);
    }
    result
}

/// Exponentially weighted mean with alpha = 1/period.
///
/// Weights are normalised over all observations seen so far
/// (`sum((1-a)^k * x[t-k]) / sum((1-a)^k)`). Values before index period-1
/// are `None`.
pub fn exponential_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 {
        return result;
    }

    let decay = 1.0 - 1.0 / period as f64;
    let mut weighted = 0.0;
    let mut weight = 0.0;
    for (i, &v) in values.iter().enumerate() {
        weighted = v + decay * weighted;
        weight = 1.0 + decay * weight;
        if i + 1 >= period {
            result[i] = Some(weighted / weight);
        }
    }
    result
}

/// One smoothed range value per bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSeries {
    period: usize,
    smoothing: RangeSmoothing,
    values: Vec<Option<f64>>,
}

impl RangeSeries {
    pub fn period(&self) -> usize {
        self.period
    }

    pub fn smoothing(&self) -> RangeSmoothing {
        self.smoothing
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Raw access: `None` for warm-up bars and out-of-range indices.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// First index with a defined value.
    pub fn first_valid(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    /// Defined value at `index`, or why there is none.
    pub fn value_at(&self, index: usize) -> Result<f64, IndicatorError> {
        if index >= self.values.len() {
            return Err(IndicatorError::IndexOutOfRange {
                index,
                len: self.values.len(),
            });
        }
        self.values[index].ok_or(IndicatorError::InsufficientHistory {
            period: self.period,
            available: index + 1,
            index,
        })
    }
}

/// Produces a [`RangeSeries`] from bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeEstimator {
    period: usize,
    smoothing: RangeSmoothing,
}

impl RangeEstimator {
    pub fn new(period: usize, smoothing: RangeSmoothing) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod(period));
        }
        Ok(Self { period, smoothing })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn smoothing(&self) -> RangeSmoothing {
        self.smoothing
    }

    pub fn estimate(&self, bars: &[Bar]) -> RangeSeries {
        let tr = true_range(bars);
        let values = match self.smoothing {
            RangeSmoothing::Simple => rolling_mean(&tr, self.period),
            RangeSmoothing::Exponential => exponential_mean(&tr, self.period),
        };
        RangeSeries {
            period: self.period,
            smoothing: self.smoothing,
            values,
        }
    }
}

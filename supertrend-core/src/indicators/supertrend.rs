//! Supertrend: range-based trailing bands with a two-state trend.
//!
//! Inherently sequential: the state at bar i is a function of the state at
//! bar i-1 and bar i only. The computation is a left-to-right fold carrying
//! `BandState`.
//!
//! Transition at each bar after the seed, in priority order:
//! 1. close > previous upper band  -> Up
//! 2. close < previous lower band  -> Down
//! 3. otherwise the trend persists
//!
//! The band on the active side trails (only tightens) while the trend
//! persists and resets to its candidate on a flip; the inactive band is
//! always the fresh candidate.

use serde::{Deserialize, Serialize};

use super::range::{RangeEstimator, RangeSeries, RangeSmoothing};
use super::IndicatorError;
use crate::domain::{Bar, Trend};

/// Per-bar Supertrend state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandState {
    pub trend: Trend,
    pub upper_band: f64,
    pub lower_band: f64,
}

impl BandState {
    /// Fixed seed for the first bar with a defined range.
    pub const SEED: Self = Self {
        trend: Trend::Up,
        upper_band: 0.0,
        lower_band: 0.0,
    };

    /// The band acting as the stop: lower when Up, upper when Down.
    pub fn active_band(&self) -> f64 {
        match self.trend {
            Trend::Up => self.lower_band,
            Trend::Down => self.upper_band,
        }
    }
}

/// Band states aligned index-for-index with the bars.
///
/// `None` marks warm-up bars whose range is undefined. The first `Some` is
/// the seed state and carries no information about the market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSeries {
    states: Vec<Option<BandState>>,
    seed_index: Option<usize>,
}

impl BandSeries {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[Option<BandState>] {
        &self.states
    }

    pub fn get(&self, index: usize) -> Option<BandState> {
        self.states.get(index).copied().flatten()
    }

    /// Index of the seed state, if any range value was defined.
    pub fn seed_index(&self) -> Option<usize> {
        self.seed_index
    }

    pub fn trend(&self, index: usize) -> Option<Trend> {
        self.get(index).map(|s| s.trend)
    }

    pub fn trend_up(&self, index: usize) -> Option<bool> {
        self.trend(index).map(Trend::is_up)
    }

    /// Plotted Supertrend line. Undefined on warm-up bars and on the seed.
    pub fn active_band(&self, index: usize) -> Option<f64> {
        if Some(index) == self.seed_index {
            return None;
        }
        self.get(index).map(|s| s.active_band())
    }
}

/// Computes [`BandSeries`] from bars and a range estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandEngine {
    multiplier: f64,
}

impl BandEngine {
    pub fn new(multiplier: f64) -> Result<Self, IndicatorError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(IndicatorError::InvalidMultiplier(multiplier));
        }
        Ok(Self { multiplier })
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// One transition: previous state + current bar + current range -> next state.
    pub fn step(&self, prev: &BandState, bar: &Bar, range: f64) -> BandState {
        let mid = bar.mid();
        let candidate_upper = mid + self.multiplier * range;
        let candidate_lower = mid - self.multiplier * range;

        let trend = if bar.close > prev.upper_band {
            Trend::Up
        } else if bar.close < prev.lower_band {
            Trend::Down
        } else {
            prev.trend
        };
        let persisted = trend == prev.trend;

        match trend {
            Trend::Up => BandState {
                trend,
                upper_band: candidate_upper,
                lower_band: if persisted {
                    candidate_lower.max(prev.lower_band)
                } else {
                    candidate_lower
                },
            },
            Trend::Down => BandState {
                trend,
                upper_band: if persisted {
                    candidate_upper.min(prev.upper_band)
                } else {
                    candidate_upper
                },
                lower_band: candidate_lower,
            },
        }
    }

    pub fn compute(&self, bars: &[Bar], range: &RangeSeries) -> Result<BandSeries, IndicatorError> {
        if bars.len() != range.len() {
            return Err(IndicatorError::LengthMismatch {
                bars: bars.len(),
                range: range.len(),
            });
        }

        let states: Vec<Option<BandState>> = bars
            .iter()
            .zip(range.values())
            .scan(None, |prev: &mut Option<BandState>, (bar, r)| {
                let next = match (*prev, *r) {
                    (_, None) => None,
                    (None, Some(_)) => Some(BandState::SEED),
                    (Some(p), Some(r)) => Some(self.step(&p, bar, r)),
                };
                *prev = next;
                Some(next)
            })
            .collect();

        Ok(BandSeries {
            seed_index: range.first_valid(),
            states,
        })
    }
}

/// Range estimate and band states from a single pass configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SupertrendOutput {
    pub range: RangeSeries,
    pub bands: BandSeries,
}

/// Range Estimator + Band Engine composed under one parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Supertrend {
    range: RangeEstimator,
    bands: BandEngine,
}

impl Supertrend {
    pub fn new(
        period: usize,
        multiplier: f64,
        smoothing: RangeSmoothing,
    ) -> Result<Self, IndicatorError> {
        Ok(Self {
            range: RangeEstimator::new(period, smoothing)?,
            bands: BandEngine::new(multiplier)?,
        })
    }

    pub fn period(&self) -> usize {
        self.range.period()
    }

    pub fn multiplier(&self) -> f64 {
        self.bands.multiplier()
    }

    pub fn compute(&self, bars: &[Bar]) -> Result<SupertrendOutput, IndicatorError> {
        let range = self.range.estimate(bars);
        let bands = self.bands.compute(bars, &range)?;
        Ok(SupertrendOutput { range, bands })
    }
}

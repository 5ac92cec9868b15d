//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function of the simulated series. No dependencies on
//! the runner, data loading, or configuration.

use serde::{Deserialize, Serialize};

/// Why a Sharpe ratio could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateReason {
    /// Strategy returns have zero variance (never in the market, or flat prices).
    ZeroVariance,
    /// Fewer than two defined strategy returns.
    TooFewReturns,
}

/// Risk-adjusted return, or an explicit marker that it is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SharpeRatio {
    Defined(f64),
    Undefined(DegenerateReason),
}

impl SharpeRatio {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined(_) => None,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Undefined(_))
    }
}

/// Scalar metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: SharpeRatio,
}

impl PerformanceMetrics {
    /// Compute all metrics from the cumulative multiplier, drawdown, and
    /// per-bar strategy return series.
    pub fn compute(
        cumulative: &[f64],
        drawdown: &[f64],
        strategy_returns: &[Option<f64>],
        annualization_factor: u32,
    ) -> Self {
        Self {
            total_return: total_return(cumulative),
            max_drawdown: max_drawdown(drawdown),
            sharpe: sharpe_ratio(strategy_returns, annualization_factor),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final cumulative multiplier - 1.
pub fn total_return(cumulative: &[f64]) -> f64 {
    cumulative.last().map_or(0.0, |m| m - 1.0)
}

/// Most negative drawdown (e.g., -0.15 = 15% below the running peak).
///
/// Returns 0.0 for an empty series or one that never declines.
pub fn max_drawdown(drawdown: &[f64]) -> f64 {
    drawdown.iter().copied().fold(0.0_f64, f64::min)
}

/// Annualized Sharpe ratio from per-bar strategy returns.
///
/// Sharpe = mean(returns) / std(returns) * sqrt(annualization_factor), over
/// the defined returns only, with the sample (n-1) standard deviation.
pub fn sharpe_ratio(strategy_returns: &[Option<f64>], annualization_factor: u32) -> SharpeRatio {
    let returns: Vec<f64> = strategy_returns.iter().flatten().copied().collect();
    if returns.len() < 2 {
        return SharpeRatio::Undefined(DegenerateReason::TooFewReturns);
    }
    let std = std_dev(&returns);
    if std < 1e-15 || !std.is_finite() {
        return SharpeRatio::Undefined(DegenerateReason::ZeroVariance);
    }
    SharpeRatio::Defined(mean(&returns) / std * f64::from(annualization_factor).sqrt())
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator). 0.0 for fewer than 2 values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

//! Backtest simulator: signals to positions, returns, equity, drawdown.
//!
//! Long-only, single unit: the position is 1 after a Buy and 0 after a Sell.
//! A signal computed from bar i's close affects returns from bar
//! i + execution_lag_bars onward.

use serde::{Deserialize, Serialize};
use supertrend_core::{Bar, Signal};
use thiserror::Error;

use crate::metrics::PerformanceMetrics;

/// Simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    pub annualization_factor: u32,
    pub execution_lag_bars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("bar count {bars} does not match signal count {signals}")]
    LengthMismatch { bars: usize, signals: usize },
}

/// Per-bar simulation series, all aligned with the bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub position: Vec<u8>,
    /// close[i] / close[i-1] - 1; `None` at bar 0.
    pub bar_return: Vec<Option<f64>>,
    /// position[i - lag] * bar_return[i]; `None` at bar 0 and while i < lag.
    pub strategy_return: Vec<Option<f64>>,
    pub cumulative: Vec<f64>,
    pub equity: Vec<f64>,
    pub peak: Vec<f64>,
    pub drawdown: Vec<f64>,
    pub metrics: PerformanceMetrics,
}

/// Saturating running sum of signal values, clamped to [0, 1].
pub fn position_series(signals: &[Signal]) -> Vec<u8> {
    signals
        .iter()
        .scan(0i8, |pos, s| {
            *pos = (*pos + s.value()).clamp(0, 1);
            Some(*pos as u8)
        })
        .collect()
}

/// Close-to-close returns.
pub fn bar_returns(bars: &[Bar]) -> Vec<Option<f64>> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| match i {
            0 => None,
            _ => Some(bar.close / bars[i - 1].close - 1.0),
        })
        .collect()
}

/// Strategy returns under an execution lag.
///
/// Bars with no lagged position yet have no strategy return, so they are
/// left out of equity compounding and of the Sharpe sample alike.
pub fn strategy_returns(position: &[u8], bar_return: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    bar_return
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let held = position.get(i.checked_sub(lag)?)?;
            r.map(|r| f64::from(*held) * r)
        })
        .collect()
}

/// Run the simulation over a complete bar sequence and its signals.
///
/// `signals` must be aligned with `bars`.
pub fn simulate(
    bars: &[Bar],
    signals: &[Signal],
    config: &SimulationConfig,
) -> Result<Simulation, SimulationError> {
    if bars.len() != signals.len() {
        return Err(SimulationError::LengthMismatch {
            bars: bars.len(),
            signals: signals.len(),
        });
    }

    let position = position_series(signals);
    let bar_return = bar_returns(bars);
    let strategy_return = strategy_returns(&position, &bar_return, config.execution_lag_bars);

    let cumulative: Vec<f64> = strategy_return
        .iter()
        .scan(1.0_f64, |acc, r| {
            if let Some(r) = r {
                *acc *= 1.0 + r;
            }
            Some(*acc)
        })
        .collect();

    let equity = cumulative
        .iter()
        .map(|m| config.initial_capital * m)
        .collect();

    let peak: Vec<f64> = cumulative
        .iter()
        .scan(f64::NEG_INFINITY, |peak, &m| {
            *peak = peak.max(m);
            Some(*peak)
        })
        .collect();

    let drawdown: Vec<f64> = cumulative
        .iter()
        .zip(&peak)
        .map(|(&m, &p)| if p > 0.0 { (m - p) / p } else { 0.0 })
        .collect();

    let metrics = PerformanceMetrics::compute(
        &cumulative,
        &drawdown,
        &strategy_return,
        config.annualization_factor,
    );

    Ok(Simulation {
        position,
        bar_return,
        strategy_return,
        cumulative,
        equity,
        peak,
        drawdown,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{DegenerateReason, SharpeRatio};
    use crate::test_helpers::bars_from_closes;
    use supertrend_core::Signal::{Buy, None as N, Sell};

    fn config(lag: usize) -> SimulationConfig {
        SimulationConfig {
            initial_capital: 10_000.0,
            annualization_factor: 252,
            execution_lag_bars: lag,
        }
    }

    #[test]
    fn position_saturates() {
        assert_eq!(
            position_series(&[N, Sell, Buy, Buy, N, Sell, Sell, Buy]),
            vec![0, 0, 1, 1, 1, 0, 0, 1]
        );
    }

    #[test]
    fn one_bar_lag_applies_signal_next_bar() {
        let bars = bars_from_closes(&[100.0, 110.0, 121.0, 108.9]);
        let signals = [N, Buy, N, Sell];
        let sim = simulate(&bars, &signals, &config(1)).unwrap();

        assert_eq!(sim.position, vec![0, 1, 1, 0]);
        assert_eq!(sim.strategy_return[0], None);
        // Bought at bar 1's close: bar 1's own return is not captured.
        assert_eq!(sim.strategy_return[1], Some(0.0));
        assert!((sim.strategy_return[2].unwrap() - 0.1).abs() < 1e-12);
        // Sell at bar 3 is only effective from bar 4; bar 3's drop is held.
        assert!((sim.strategy_return[3].unwrap() + 0.1).abs() < 1e-12);
        assert!((sim.equity[3] - 9_900.0).abs() < 1e-6);
    }

    #[test]
    fn zero_lag_acts_on_signal_bar() {
        let bars = bars_from_closes(&[100.0, 110.0, 121.0]);
        let sim = simulate(&bars, &[N, Buy, N], &config(0)).unwrap();
        assert!((sim.strategy_return[1].unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn longer_lag_delays_entry() {
        let bars = bars_from_closes(&[100.0, 110.0, 121.0, 133.1]);
        let sim = simulate(&bars, &[Buy, N, N, N], &config(2)).unwrap();
        // No lagged position exists at bar 1, so it has no strategy return.
        assert_eq!(sim.strategy_return[..2], [None, None]);
        assert!((sim.strategy_return[2].unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(sim.equity[1], 10_000.0);
    }

    #[test]
    fn unlagged_bars_stay_out_of_sharpe() {
        let bars = bars_from_closes(&[100.0, 110.0, 121.0, 133.1, 146.41]);
        let sim = simulate(&bars, &[Buy, N, N, N, N], &config(3)).unwrap();
        // Bars 3 and 4 both earn +10%; leading filler zeros would add variance.
        assert_eq!(sim.strategy_return.iter().flatten().count(), 2);
        assert_eq!(
            sim.metrics.sharpe,
            SharpeRatio::Undefined(DegenerateReason::ZeroVariance)
        );
    }

    #[test]
    fn drawdown_from_running_peak() {
        let bars = bars_from_closes(&[100.0, 120.0, 90.0, 150.0]);
        let sim = simulate(&bars, &[Buy, N, N, N], &config(1)).unwrap();
        // multiplier: 1, 1.2, 0.9, 1.5
        assert!((sim.cumulative[2] - 0.9).abs() < 1e-12);
        assert!((sim.drawdown[2] + 0.25).abs() < 1e-12);
        assert_eq!(sim.drawdown[3], 0.0);
        assert!((sim.metrics.max_drawdown + 0.25).abs() < 1e-12);
        assert!((sim.metrics.total_return - 0.5).abs() < 1e-12);
    }

    #[test]
    fn always_flat_is_degenerate() {
        let bars = bars_from_closes(&[100.0, 101.0, 99.0, 103.0]);
        let sim = simulate(&bars, &[N; 4], &config(1)).unwrap();
        assert_eq!(sim.metrics.total_return, 0.0);
        assert_eq!(sim.metrics.max_drawdown, 0.0);
        assert_eq!(
            sim.metrics.sharpe,
            SharpeRatio::Undefined(DegenerateReason::ZeroVariance)
        );
        assert!(sim.equity.iter().all(|&e| e == 10_000.0));
    }

    #[test]
    fn misaligned_signals_rejected() {
        let bars = bars_from_closes(&[100.0, 101.0, 99.0, 103.0]);
        let err = simulate(&bars, &[Buy, N], &config(1)).unwrap_err();
        assert_eq!(err, SimulationError::LengthMismatch { bars: 4, signals: 2 });
    }

    #[test]
    fn single_bar_has_too_few_returns() {
        let bars = bars_from_closes(&[100.0]);
        let sim = simulate(&bars, &[N], &config(1)).unwrap();
        assert_eq!(sim.cumulative, vec![1.0]);
        assert_eq!(
            sim.metrics.sharpe,
            SharpeRatio::Undefined(DegenerateReason::TooFewReturns)
        );
    }
}

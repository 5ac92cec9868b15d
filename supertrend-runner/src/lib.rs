//! Supertrend Runner: backtest orchestration, metrics, and the I/O edges.
//!
//! This crate builds on `supertrend-core` to provide:
//! - TOML configuration with a content-addressed run id
//! - Long-only simulation with execution lag, equity, and drawdown
//! - Performance metrics with explicit degenerate-Sharpe handling
//! - CSV bar loading and artifact export
//! - A signal-only order executor for live collaborators

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod execution;
pub mod metrics;
pub mod reporting;
pub mod runner;

pub use backtest::{simulate, Simulation, SimulationConfig, SimulationError};
pub use config::{BacktestConfig, ConfigError, DataSection, RunId, SimulationSection, StrategyConfig};
pub use data_loader::{dataset_hash, mark_forming_bar, BarSource, CsvBarSource, LoadError};
pub use execution::{act_on_latest_signal, ExecutionError, OrderAck, OrderExecutor, OrderSide, PaperExecutor};
pub use metrics::{DegenerateReason, PerformanceMetrics, SharpeRatio};
pub use reporting::{save_artifacts, ArtifactPaths};
pub use runner::{annotate, run_backtest, Annotated, BacktestResult, EnrichedRow, RunError};

#[cfg(test)]
pub(crate) mod test_helpers {
    use chrono::{Duration, TimeZone, Utc};
    use supertrend_core::Bar;

    /// Daily bars with high = close + 1 and low = close - 1.
    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: base + Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1_000.0,
                is_closed: true,
            })
            .collect()
    }

    pub fn config_toml(atr_period: usize, multiplier: f64, smoothing: &str) -> String {
        format!(
            r#"
[strategy]
atr_period = {atr_period}
multiplier = {multiplier:?}
range_smoothing = "{smoothing}"

[backtest]
initial_capital = 10000.0
annualization_factor = 252
"#
        )
    }
}

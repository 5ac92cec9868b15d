//! Backtest runner: wires together validation, indicators, signals, and simulation.
//!
//! Two entry points:
//! - `annotate()`: indicator-only pass producing the enriched bar table.
//!   Used by the `signal` command and live collaborators.
//! - `run_backtest()`: annotate + simulate + metrics. Used by the `run` command.
//!
//! Both are pure: no I/O, no shared state, identical input gives identical output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use supertrend_core::{
    generate_signals, validate_bars, Bar, BarError, FormingBarPolicy, IndicatorError, Signal,
    SupertrendOutput,
};

use crate::backtest::{simulate, Simulation, SimulationError};
use crate::config::{BacktestConfig, ConfigError, RunId, StrategyConfig};
use crate::data_loader::{dataset_hash, LoadError};
use crate::execution::ExecutionError;
use crate::metrics::{PerformanceMetrics, SharpeRatio};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("bar error: {0}")]
    Bars(#[from] BarError),
    #[error("indicator error: {0}")]
    Indicator(#[from] IndicatorError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// One bar with every derived column appended.
///
/// Indicator columns are `None` during warm-up. Backtest columns are `None`
/// when only an indicator pass was run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub is_closed: bool,
    pub range: Option<f64>,
    pub trend_up: Option<bool>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub supertrend: Option<f64>,
    pub signal: Signal,
    pub position: Option<u8>,
    pub bar_return: Option<f64>,
    pub strategy_return: Option<f64>,
    pub equity: Option<f64>,
    pub drawdown: Option<f64>,
}

/// Output of an indicator-only pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotated {
    pub indicator: SupertrendOutput,
    pub signals: Vec<Signal>,
    pub rows: Vec<EnrichedRow>,
    pub includes_forming_bar: bool,
}

/// Complete result of a single backtest run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<f64>,
    pub rows: Vec<EnrichedRow>,
    pub includes_forming_bar: bool,
    pub signal_count: usize,
    pub bar_count: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Validate bars and compute range, bands, and signals.
pub fn annotate(
    bars: &[Bar],
    strategy: &StrategyConfig,
    policy: FormingBarPolicy,
) -> Result<Annotated, RunError> {
    let summary = validate_bars(bars, policy)?;
    if summary.includes_forming_bar {
        warn!(
            index = summary.len - 1,
            "computation includes a bar that is still forming"
        );
    }

    let supertrend = strategy.supertrend()?;
    if bars.len() < supertrend.period() {
        return Err(IndicatorError::InsufficientHistory {
            period: supertrend.period(),
            available: bars.len(),
            index: supertrend.period() - 1,
        }
        .into());
    }

    let indicator = supertrend.compute(bars)?;
    debug!(
        bars = bars.len(),
        first_valid = ?indicator.range.first_valid(),
        "range and bands computed"
    );

    let signals = generate_signals(&indicator.bands);
    debug!(
        signals = signals.iter().filter(|s| !s.is_none()).count(),
        "signals generated"
    );

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let state = indicator.bands.get(i);
            EnrichedRow {
                timestamp: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                is_closed: bar.is_closed,
                range: indicator.range.get(i),
                trend_up: state.map(|s| s.trend.is_up()),
                upper_band: state.map(|s| s.upper_band),
                lower_band: state.map(|s| s.lower_band),
                supertrend: indicator.bands.active_band(i),
                signal: signals[i],
                position: None,
                bar_return: None,
                strategy_return: None,
                equity: None,
                drawdown: None,
            }
        })
        .collect();

    Ok(Annotated {
        indicator,
        signals,
        rows,
        includes_forming_bar: summary.includes_forming_bar,
    })
}

/// Run the full pipeline: bars -> range -> bands -> signals -> simulation.
pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let annotated = annotate(bars, &config.strategy, config.forming_bar_policy())?;
    let sim = simulate(bars, &annotated.signals, &config.simulation())?;

    if let SharpeRatio::Undefined(reason) = sim.metrics.sharpe {
        warn!(?reason, "sharpe ratio undefined for this run");
    }

    let rows = attach_simulation(annotated.rows, &sim);
    let signal_count = annotated.signals.iter().filter(|s| !s.is_none()).count();

    let result = BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id()?,
        dataset_hash: dataset_hash(bars),
        config: config.clone(),
        metrics: sim.metrics.clone(),
        equity_curve: sim.equity.clone(),
        rows,
        includes_forming_bar: annotated.includes_forming_bar,
        signal_count,
        bar_count: bars.len(),
    };

    info!(
        run_id = %result.run_id,
        bars = result.bar_count,
        signals = result.signal_count,
        total_return = result.metrics.total_return,
        max_drawdown = result.metrics.max_drawdown,
        sharpe = ?result.metrics.sharpe.value(),
        "backtest complete"
    );
    Ok(result)
}

fn attach_simulation(rows: Vec<EnrichedRow>, sim: &Simulation) -> Vec<EnrichedRow> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| EnrichedRow {
            position: Some(sim.position[i]),
            bar_return: sim.bar_return[i],
            strategy_return: sim.strategy_return[i],
            equity: Some(sim.equity[i]),
            drawdown: Some(sim.drawdown[i]),
            ..row
        })
        .collect()
}

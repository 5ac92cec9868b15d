//! Supertrend Core: bar domain types, range estimation, band engine, signals.
//!
//! This crate is the pure, synchronous part of the pipeline:
//! - Domain types (bars, trend, signals) and boundary validation
//! - Range estimator (true range, simple or exponential smoothing)
//! - Band engine (stateful Supertrend fold with trailing bands)
//! - Signal generator (trend flips -> Buy/Sell)
//!
//! Data flows strictly forward in time. Nothing here performs I/O.

pub mod domain;
pub mod indicators;
pub mod signals;

pub use domain::{validate_bars, Bar, BarError, BarSummary, FormingBarPolicy, Signal, Trend};
pub use indicators::{
    BandEngine, BandSeries, BandState, IndicatorError, RangeEstimator, RangeSeries,
    RangeSmoothing, Supertrend, SupertrendOutput,
};
pub use signals::{generate_signals, latest_actionable};

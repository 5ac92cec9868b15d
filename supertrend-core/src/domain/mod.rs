//! Domain types for the Supertrend pipeline.

pub mod bar;
pub mod signal;

pub use bar::{validate_bars, Bar, BarError, BarSummary, FormingBarPolicy};
pub use signal::{Signal, Trend};

//! Signal generation: trend flips become entry/exit signals.
//!
//! Signals are derived from band states only; they never see positions or
//! equity. Each signal at bar i depends on states i-1 and i.

pub mod flip;

pub use flip::{generate_signals, latest_actionable};

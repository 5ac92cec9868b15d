//! Serializable backtest configuration (TOML).
//!
//! Every numeric parameter that changes results must be spelled out in the
//! file. Only `execution_lag_bars` (1) and `allow_forming_bar` (false) have
//! defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use supertrend_core::{FormingBarPolicy, RangeSmoothing, Supertrend};
use thiserror::Error;

use crate::backtest::SimulationConfig;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to serialize config for run id: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Indicator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub atr_period: usize,
    pub multiplier: f64,
    pub range_smoothing: RangeSmoothing,
}

impl StrategyConfig {
    pub fn supertrend(&self) -> Result<Supertrend, ConfigError> {
        Supertrend::new(self.atr_period, self.multiplier, self.range_smoothing).map_err(|e| {
            ConfigError::Invalid {
                field: "strategy",
                reason: e.to_string(),
            }
        })
    }
}

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSection {
    pub initial_capital: f64,
    pub annualization_factor: u32,
    #[serde(default = "default_execution_lag")]
    pub execution_lag_bars: usize,
    #[serde(default)]
    pub allow_forming_bar: bool,
}

fn default_execution_lag() -> usize {
    1
}

/// Where the CLI finds bars. Not part of the run identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub path: PathBuf,
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

fn default_symbol() -> String {
    "UNKNOWN".into()
}

/// Full backtest configuration as read from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy: StrategyConfig,
    pub backtest: SimulationSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSection>,
}

#[derive(Serialize)]
struct Identity<'a> {
    strategy: &'a StrategyConfig,
    backtest: &'a SimulationSection,
}

impl BacktestConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy.atr_period == 0 {
            return Err(ConfigError::Invalid {
                field: "strategy.atr_period",
                reason: "must be > 0".into(),
            });
        }
        if !self.strategy.multiplier.is_finite() || self.strategy.multiplier <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "strategy.multiplier",
                reason: format!("must be finite and > 0, got {}", self.strategy.multiplier),
            });
        }
        let capital = self.backtest.initial_capital;
        if !capital.is_finite() || capital <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "backtest.initial_capital",
                reason: format!("must be finite and > 0, got {capital}"),
            });
        }
        if self.backtest.annualization_factor == 0 {
            return Err(ConfigError::Invalid {
                field: "backtest.annualization_factor",
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }

    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            initial_capital: self.backtest.initial_capital,
            annualization_factor: self.backtest.annualization_factor,
            execution_lag_bars: self.backtest.execution_lag_bars,
        }
    }

    pub fn forming_bar_policy(&self) -> FormingBarPolicy {
        if self.backtest.allow_forming_bar {
            FormingBarPolicy::Include
        } else {
            FormingBarPolicy::Reject
        }
    }

    /// Deterministic hash over the parameters that shape results.
    ///
    /// The `[data]` section is excluded: the same parameters over a different
    /// file share a run id and are told apart by the dataset hash.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let identity = Identity {
            strategy: &self.strategy,
            backtest: &self.backtest,
        };
        let json = serde_json::to_string(&identity)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

//! Run manifest export (JSON).

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::metrics::PerformanceMetrics;
use crate::runner::BacktestResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub dataset_hash: String,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub bar_count: usize,
    pub signal_count: usize,
    pub includes_forming_bar: bool,
    pub first_bar: Option<DateTime<Utc>>,
    pub last_bar: Option<DateTime<Utc>>,
}

impl RunManifest {
    pub fn from_result(result: &BacktestResult) -> Self {
        Self {
            schema_version: result.schema_version,
            run_id: result.run_id.clone(),
            dataset_hash: result.dataset_hash.clone(),
            config: result.config.clone(),
            metrics: result.metrics.clone(),
            bar_count: result.bar_count,
            signal_count: result.signal_count,
            includes_forming_bar: result.includes_forming_bar,
            first_bar: result.rows.first().map(|r| r.timestamp),
            last_bar: result.rows.last().map(|r| r.timestamp),
        }
    }
}

pub fn write_manifest(path: &Path, result: &BacktestResult) -> Result<()> {
    let manifest = RunManifest::from_result(result);
    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

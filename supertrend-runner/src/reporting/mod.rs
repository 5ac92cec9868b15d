//! Artifact export for completed runs.

mod manifest;
mod tables;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::runner::BacktestResult;

pub use manifest::RunManifest;

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub manifest: PathBuf,
    pub enriched_csv: PathBuf,
    pub equity_csv: PathBuf,
}

/// Write `<output_dir>/<run_id>/{manifest.json, enriched.csv, equity.csv}`.
///
/// Re-running the same config over the same data overwrites the same files.
pub fn save_artifacts(result: &BacktestResult, output_dir: impl AsRef<Path>) -> Result<ArtifactPaths> {
    let run_dir = output_dir.as_ref().join(&result.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create run directory {}", run_dir.display()))?;

    let manifest = run_dir.join("manifest.json");
    manifest::write_manifest(&manifest, result)?;

    let enriched_csv = run_dir.join("enriched.csv");
    tables::write_enriched_csv(&enriched_csv, &result.rows)?;

    let equity_csv = run_dir.join("equity.csv");
    tables::write_equity_csv(&equity_csv, &result.rows)?;

    info!(run_id = %result.run_id, dir = %run_dir.display(), "artifacts saved");

    Ok(ArtifactPaths {
        run_dir,
        manifest,
        enriched_csv,
        equity_csv,
    })
}

//! Enriched table and equity curve export (CSV).

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::runner::EnrichedRow;

/// Undefined cells are written empty.
pub fn write_enriched_csv(path: &Path, rows: &[EnrichedRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create enriched CSV {}", path.display()))?;
    for row in rows {
        writer.serialize(row).context("Failed to write enriched row")?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct EquityRecord {
    timestamp: DateTime<Utc>,
    equity: Option<f64>,
    drawdown: Option<f64>,
}

pub fn write_equity_csv(path: &Path, rows: &[EnrichedRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    for row in rows {
        writer
            .serialize(EquityRecord {
                timestamp: row.timestamp,
                equity: row.equity,
                drawdown: row.drawdown,
            })
            .context("Failed to write equity row")?;
    }
    writer.flush()?;
    Ok(())
}

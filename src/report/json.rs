use super::types::Report;
use anyhow::{Context, Result};
use std::path::Path;

/// Write the report as pretty-printed JSON, replacing any previous file
pub fn write(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    log::info!("JSON report saved to: {}", path.display());
    Ok(())
}

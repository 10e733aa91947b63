//! Batch input loading
//!
//! Reads collected domain reports and overlay records from disk. A report that
//! cannot be read or parsed is logged and left out of the batch: the graph
//! treats a missing domain as missing, it never retries.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::reports::{DomainReport, OverlayRecord};

/// Reports that made it into the batch, plus the files that did not
#[derive(Debug, Default)]
pub struct ReportBatch {
    pub reports: Vec<DomainReport>,
    pub skipped: Vec<(PathBuf, String)>,
}

fn read_report(path: &Path) -> Result<DomainReport> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let report: DomainReport =
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    report
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(report)
}

/// Load every `*.json` file of a directory as a domain report, in file name order
pub fn load_reports(dir: &Path) -> Result<ReportBatch> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing report directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json")))
        .collect();
    paths.sort();

    let mut batch = ReportBatch::default();
    for path in paths {
        match read_report(&path) {
            Ok(report) => batch.reports.push(report),
            Err(e) => {
                warn!("Skipping report {}: {:#}", path.display(), e);
                batch.skipped.push((path, format!("{:#}", e)));
            }
        }
    }

    info!(
        "Loaded {} report(s) from {} ({} skipped)",
        batch.reports.len(),
        dir.display(),
        batch.skipped.len()
    );
    Ok(batch)
}

/// Load a JSON array of overlay records. Unlike reports, a bad overlay file is an error.
pub fn load_overlays(path: &Path) -> Result<Vec<OverlayRecord>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let overlays: Vec<OverlayRecord> =
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    for overlay in &overlays {
        overlay
            .domain
            .validate()
            .with_context(|| format!("validating overlay in {}", path.display()))?;
    }
    Ok(overlays)
}

//! Report writing and archive rotation.
//!
//! The runner emits structured records; this module persists the aggregate
//! JSON report and rotates the previous run's report into an archive
//! directory with a monotonically incrementing name. All operations are
//! idempotent filesystem housekeeping, independent of the runner.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::HarnessResult;
use crate::runner::RunReport;

/// File name of the most recent run's report
pub const CURRENT_REPORT: &str = "current-report.json";

/// Subdirectory archived reports rotate into
pub const ARCHIVE_DIR: &str = "old";

/// Create the reports directory if missing
pub fn ensure_reports_dir(dir: &Path) -> HarnessResult<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        info!("created reports directory: {}", dir.display());
    }
    Ok(())
}

/// Remove the reports directory and everything under it
pub fn clean_reports_dir(dir: &Path) -> HarnessResult<bool> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
        info!("removed reports directory: {}", dir.display());
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Move the current report, if any, into `old/report_<n>.json` where `n` is
/// the count of already-archived reports plus one
pub fn archive_current(dir: &Path) -> HarnessResult<Option<PathBuf>> {
    let current = dir.join(CURRENT_REPORT);
    if !current.exists() {
        return Ok(None);
    }

    let archive = dir.join(ARCHIVE_DIR);
    std::fs::create_dir_all(&archive)?;

    let archived = std::fs::read_dir(&archive)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "json")
                .unwrap_or(false)
        })
        .count();

    let target = archive.join(format!("report_{}.json", archived + 1));
    std::fs::rename(&current, &target)?;
    info!(
        "archived {} as {}",
        CURRENT_REPORT,
        target.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(Some(target))
}

/// Write the run report as pretty JSON, returning its path
pub fn write_report(dir: &Path, report: &RunReport) -> HarnessResult<PathBuf> {
    ensure_reports_dir(dir)?;

    let path = dir.join(CURRENT_REPORT);
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;

    info!("report written to: {}", path.display());
    Ok(path)
}

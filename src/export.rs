//! Writes the log view to a plain-text file with a metadata header.

use chrono::{DateTime, Local};
use color_eyre::eyre::{eyre, Result};
use std::path::{Path, PathBuf};

/// Everything needed to export the current log view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExport {
    pub repo_slug: String,
    pub branch: String,
    pub run_number: u64,
    pub run_id: u64,
    pub job_id: Option<u64>,
    pub content: String,
}

impl LogExport {
    /// `ghmon-logs-{repo}-{run_id}-{YYYYMMDD-HHMMSS}.txt`, with `/` in the slug flattened.
    pub fn file_name(&self, at: DateTime<Local>) -> String {
        format!(
            "ghmon-logs-{}-{}-{}.txt",
            self.repo_slug.replace('/', "-"),
            self.run_id,
            at.format("%Y%m%d-%H%M%S")
        )
    }

    pub fn render(&self, at: DateTime<Local>) -> String {
        let job = self.job_id.map(|id| id.to_string()).unwrap_or_default();
        format!(
            "# ghmon Log Export\n\
             # Repository: {}\n\
             # Branch: {}\n\
             # Run: #{} (ID: {})\n\
             # Job ID: {}\n\
             # Exported: {}\n\
             #\n\n{}",
            self.repo_slug,
            self.branch,
            self.run_number,
            self.run_id,
            job,
            at.to_rfc3339(),
            self.content
        )
    }

    /// Writes the export into `dir` and returns the file's path.
    pub fn write_to(&self, dir: &Path, at: DateTime<Local>) -> Result<PathBuf> {
        let path = dir.join(self.file_name(at));
        std::fs::write(&path, self.render(at))
            .map_err(|e| eyre!("Failed to save logs to {}: {e}", path.display()))?;
        Ok(path)
    }
}

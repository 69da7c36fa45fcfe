use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::report::CheckReport;
use crate::export::Exporter;

/// Writes `errors-{id}.json`, mapping category names to messages.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
    print_only_errors: bool,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf, print_only_errors: bool) -> Self {
        Self {
            out_dir,
            print_only_errors,
        }
    }

    pub fn log_path(out_dir: &Path, submission_id: &str) -> PathBuf {
        out_dir.join(format!("errors-{submission_id}.json"))
    }
}

impl Exporter for JsonExporter {
    fn export(&self, submission_id: &str, report: &CheckReport) -> Result<()> {
        if self.print_only_errors && report.errors == 0 {
            debug!(submission_id, "no errors; log not written");
            return Ok(());
        }
        fs::create_dir_all(&self.out_dir)?;
        let path = Self::log_path(&self.out_dir, submission_id);
        let data = report.to_json()?;
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

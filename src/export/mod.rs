pub mod json_export;
pub mod summary;

use anyhow::Result;

use crate::core::report::CheckReport;

pub use json_export::JsonExporter;
pub use summary::{render_summary, ConsoleExporter};

pub trait Exporter {
    fn export(&self, submission_id: &str, report: &CheckReport) -> Result<()>;
}

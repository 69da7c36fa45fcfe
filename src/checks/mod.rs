pub mod bibliography;
pub mod fonts;
pub mod name_check;
pub mod page_budget;
pub mod page_geometry;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::report::{Category, CheckReport, Findings};

/// Mutable state of one document check.
///
/// Checkers run in a fixed order against the same session; pages excluded by
/// an earlier checker stay excluded for every later one.
#[derive(Debug, Clone)]
pub struct CheckSession {
    pub submission_id: String,
    pub pdf_path: PathBuf,
    pub output_dir: PathBuf,
    findings: Findings,
    page_errors: BTreeSet<usize>,
}

impl CheckSession {
    pub fn new(pdf_path: &Path, output_dir: &Path) -> Self {
        Self {
            submission_id: submission_id(pdf_path),
            pdf_path: pdf_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            findings: Findings::new(),
            page_errors: BTreeSet::new(),
        }
    }

    pub fn add(&mut self, category: Category, message: impl Into<String>) {
        self.findings.entry(category).or_default().push(message.into());
    }

    /// Excludes a 1-based page from every later geometric check.
    pub fn exclude_page(&mut self, page: usize) {
        self.page_errors.insert(page);
    }

    pub fn is_excluded(&self, page: usize) -> bool {
        self.page_errors.contains(&page)
    }

    pub fn excluded_pages(&self) -> &BTreeSet<usize> {
        &self.page_errors
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }

    pub fn into_report(self) -> CheckReport {
        CheckReport::from_findings(self.findings)
    }
}

/// The leading `_`-separated part of the file name, without `.pdf`.
pub fn submission_id(pdf_path: &Path) -> String {
    let file_name = pdf_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .split('_')
        .next()
        .unwrap_or_default()
        .replace(".pdf", "")
}

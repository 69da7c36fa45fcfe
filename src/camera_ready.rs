//! Batch check of accepted papers listed in a proceedings `papers.yaml`.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::config::PaperType;
use crate::pipeline::{CheckOptions, FormatChecker};

/// Scalar that may be written as a number or a string in the manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Emails {
    One(String),
    Many(Vec<String>),
}

impl Default for Emails {
    fn default() -> Self {
        Emails::Many(Vec::new())
    }
}

impl Emails {
    fn joined(&self) -> String {
        match self {
            Emails::One(email) => email.clone(),
            Emails::Many(emails) => emails.join(";"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorEntry {
    pub name: String,
    #[serde(default)]
    pub emails: Emails,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PaperAttributes {
    #[serde(default)]
    pub paper_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaperEntry {
    pub id: Scalar,
    pub file: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<AuthorEntry>,
    #[serde(default)]
    pub attributes: PaperAttributes,
}

/// Paper type for the whole batch, or `Auto` to read it per paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperTypeChoice {
    Fixed(PaperType),
    Auto,
}

impl PaperTypeChoice {
    pub fn resolve(self, paper: &PaperEntry) -> PaperType {
        let declared = match self {
            PaperTypeChoice::Fixed(paper_type) => return paper_type,
            PaperTypeChoice::Auto => paper.attributes.paper_type.as_deref().unwrap_or(""),
        };
        if declared.contains("short") {
            PaperType::Short
        } else if declared.contains("long") {
            PaperType::Long
        } else {
            warn!(paper = %paper.id, declared, "unknown paper type, checking without a page limit");
            PaperType::Other
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraReadyOptions {
    pub papers_yaml: PathBuf,
    pub papers_dir: PathBuf,
    pub paper_type: PaperTypeChoice,
    pub output_file: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraReadySummary {
    pub checked: usize,
    pub failed: usize,
}

pub fn read_papers(path: &Path) -> Result<Vec<PaperEntry>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_yaml::from_reader(file).with_context(|| format!("failed to parse {}", path.display()))
}

pub const TSV_HEADER: [&str; 7] = ["correct", "id", "file", "title", "authors", "emails", "logs"];

/// Checks every paper with the given checker and writes one TSV row per
/// paper. Logs are persisted only for papers with errors.
pub fn run_camera_ready(checker: &FormatChecker, options: &CameraReadyOptions) -> Result<CameraReadySummary> {
    let papers = read_papers(&options.papers_yaml)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&options.output_file)
        .with_context(|| format!("failed to create {}", options.output_file.display()))?;
    writer.write_record(TSV_HEADER)?;

    let mut summary = CameraReadySummary::default();
    for paper in &papers {
        let mut check_options = CheckOptions::new(options.paper_type.resolve(paper), options.output_dir.clone());
        check_options.print_only_errors = true;

        let pdf_path = options.papers_dir.join(&paper.file);
        let outcome = checker
            .check_and_export(&pdf_path, &check_options)
            .with_context(|| format!("failed to check paper {}", paper.id))?;

        let correct = outcome.report.correct;
        let logs = if correct {
            "{}".to_string()
        } else {
            outcome.report.to_json()?
        };
        let names = paper.authors.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(";");
        let emails = paper.authors.iter().map(|a| a.emails.joined()).collect::<Vec<_>>().join(";");

        let id = paper.id.to_string();
        writer.write_record([
            if correct { "True" } else { "False" },
            id.as_str(),
            paper.file.as_str(),
            paper.title.as_str(),
            names.as_str(),
            emails.as_str(),
            logs.as_str(),
        ])?;
        writer.flush()?;

        summary.checked += 1;
        if !correct {
            summary.failed += 1;
        }
    }

    info!(checked = summary.checked, failed = summary.failed, "camera-ready batch finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
- id: 12
  file: 12.pdf
  title: A Short Note
  authors:
    - name: Mary Smith
      emails: mary@example.org
    - name: Li Wei
      emails: [li@example.org, wei@example.org]
  attributes:
    paper_type: short paper
- id: "x7"
  file: x7.pdf
  title: Untyped
"#;

    #[test]
    fn parses_manifest() -> Result<()> {
        let papers: Vec<PaperEntry> = serde_yaml::from_str(MANIFEST)?;
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].id.to_string(), "12");
        assert_eq!(papers[0].authors[1].emails.joined(), "li@example.org;wei@example.org");
        assert_eq!(papers[1].id, Scalar::Text("x7".into()));
        assert!(papers[1].authors.is_empty());
        Ok(())
    }

    #[test]
    fn resolves_paper_types() -> Result<()> {
        let papers: Vec<PaperEntry> = serde_yaml::from_str(MANIFEST)?;
        assert_eq!(PaperTypeChoice::Auto.resolve(&papers[0]), PaperType::Short);
        assert_eq!(PaperTypeChoice::Auto.resolve(&papers[1]), PaperType::Other);
        assert_eq!(PaperTypeChoice::Fixed(PaperType::Long).resolve(&papers[0]), PaperType::Long);
        Ok(())
    }
}

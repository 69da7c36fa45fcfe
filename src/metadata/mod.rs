//! Submission metadata from the conference management export, cross-checked
//! against the camera-ready PDFs.

pub mod checks;
pub mod sheet;
pub mod signatures;

pub use checks::{check_metadata, MetadataReport, ProblemKind};
pub use sheet::{post_problems, SheetClient, SheetTarget};
pub use signatures::{render_signatures, write_signatures};

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Author slots in the submission form.
pub const MAX_AUTHORS: usize = 25;

pub const NAME_PARTS: [&str; 3] = ["First", "Middle", "Last"];

/// One row of the submissions CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub submission_id: u64,
    /// 1-based position among the data rows.
    pub row: usize,
    fields: HashMap<String, String>,
}

impl SubmissionRecord {
    pub fn new(submission_id: u64, row: usize, fields: HashMap<String, String>) -> Self {
        Self {
            submission_id,
            row,
            fields,
        }
    }

    /// Raw cell value; missing columns read as empty.
    pub fn field(&self, column: &str) -> &str {
        self.fields.get(column).map_or("", String::as_str)
    }

    pub fn name_part(&self, author: usize, part: &str) -> &str {
        self.field(&format!("{author}: {part} Name"))
    }

    pub fn affiliation(&self, author: usize) -> &str {
        self.field(&format!("{author}: Affiliation"))
    }

    /// Every author name token in form order, cleaned.
    pub fn author_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for author in 1..=MAX_AUTHORS {
            for part in NAME_PARTS {
                let cleaned = clean_str(self.name_part(author, part));
                tokens.extend(cleaned.split_whitespace().map(str::to_string));
            }
        }
        tokens
    }
}

/// Reads the submissions CSV. Every row needs a numeric `Submission ID`.
pub fn read_submissions(path: &Path) -> Result<Vec<SubmissionRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open submissions file {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("malformed row {} in {}", index + 1, path.display()))?;
        let fields: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        let raw_id = fields
            .get("Submission ID")
            .with_context(|| format!("row {} has no Submission ID", index + 1))?;
        let submission_id = raw_id
            .trim()
            .parse::<u64>()
            .with_context(|| format!("row {}: invalid Submission ID {raw_id:?}", index + 1))?;
        records.push(SubmissionRecord::new(submission_id, index + 1, fields));
    }
    Ok(records)
}

fn space_before_mark() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\p{Zs}+(\p{Mn})").expect("valid mark pattern"))
}

/// Straightens quotes and dashes, then reattaches combining accents that PDF
/// extraction separates from their letters with a space.
pub fn clean_str(value: &str) -> String {
    let mut value: String = value
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string();

    // Composition can expose another space-mark pair, so repeat to a fixed point.
    loop {
        let next: String = space_before_mark().replace_all(&value, "$1").nfkc().collect();
        if next == value {
            return value;
        }
        value = next;
    }
}

/// Prefixes every line that is not blank.
pub(crate) fn indent(text: &str, prefix: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn cleans_quotes_dashes_and_accents() {
        assert_eq!(clean_str("  \u{201C}Deep\u{201D} \u{2018}learning\u{2019} \u{2013} a survey "), "\"Deep\" 'learning' - a survey");
        assert_eq!(clean_str("Jose\u{0301}"), "José");
        assert_eq!(clean_str("Jose \u{0301}"), "José");
    }

    #[test]
    fn indents_only_non_blank_lines() {
        assert_eq!(indent("a\n\nb", "  "), "  a\n\n  b");
    }

    #[test]
    fn reads_records_and_author_tokens() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "Submission ID,Title,1: First Name,1: Middle Name,1: Last Name,2: First Name,2: Last Name")?;
        writeln!(file, "17,A Title,Mary,Ann,Smith,,Lee")?;
        let records = read_submissions(file.path())?;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].submission_id, 17);
        assert_eq!(records[0].field("Title"), "A Title");
        assert_eq!(records[0].field("orgName"), "");
        assert_eq!(records[0].author_tokens(), vec!["Mary", "Ann", "Smith", "Lee"]);
        Ok(())
    }

    #[test]
    fn rejects_non_numeric_ids() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "Submission ID,Title")?;
        writeln!(file, "abc,T")?;
        assert!(read_submissions(file.path()).is_err());
        Ok(())
    }
}

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use crate::core::model::Document;
use crate::core::text::fold_accents;
use crate::metadata::{clean_str, indent, SubmissionRecord};
use crate::parser::PdfBackend;
use crate::pipeline::collect_pdfs;

/// Characters of the PDF's first page that are searched for metadata.
pub const HEADER_CHARS: usize = 500;

/// Organization names shorter than five characters that are still complete.
const SHORT_ORG_NAMES: &[&str] = &["IBM"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProblemKind {
    AuthorMismatch,
    AuthorMismatchCasePunctAccent,
    Copyright,
    Title,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProblemKind::AuthorMismatch => "AUTHOR-MISMATCH",
            ProblemKind::AuthorMismatchCasePunctAccent => "AUTHOR-MISMATCH-CASE-PUNCT-ACCENT",
            ProblemKind::Copyright => "COPYRIGHT",
            ProblemKind::Title => "TITLE",
        };
        f.write_str(label)
    }
}

pub type Problem = (ProblemKind, String);

const LOOSE_SEPARATOR: &str = r"[\p{Zs}\p{P}\p{Mn}]";

fn loose_separator() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(LOOSE_SEPARATOR).expect("valid separator pattern"))
}

/// Accent-folded copy of `text` plus, for every folded byte, the byte offset
/// of the source character it came from. A final entry maps the end.
fn fold_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len() + 1);
    let mut buf = [0u8; 4];
    for (offset, c) in text.char_indices() {
        let piece = fold_accents(c.encode_utf8(&mut buf));
        origin.extend(std::iter::repeat(offset).take(piece.len()));
        folded.push_str(&piece);
    }
    origin.push(text.len());
    (folded, origin)
}

/// Names must appear in form order. Anything may sit between them, so
/// affiliations and markers do not matter; only dropped or reordered authors
/// are caught.
pub fn author_problem(names: &[String], text: &str) -> Result<Option<Problem>> {
    let exact = names.iter().map(|n| regex::escape(n)).collect::<Vec<_>>().join(".*?");
    if RegexBuilder::new(&exact)
        .dot_matches_new_line(true)
        .build()
        .context("failed to build author pattern")?
        .is_match(text)
    {
        return Ok(None);
    }

    let char_gap = format!("{LOOSE_SEPARATOR}*");
    let loose = names
        .iter()
        .flat_map(|name| loose_separator().split(name))
        .map(|piece| {
            piece
                .chars()
                .map(|c| regex::escape(&fold_accents(&c.to_string())))
                .collect::<Vec<_>>()
                .join(&char_gap)
        })
        .collect::<Vec<_>>()
        .join(".*?");
    let (folded, origin) = fold_with_offsets(text);
    let loose_match = RegexBuilder::new(&loose)
        .dot_matches_new_line(true)
        .case_insensitive(true)
        .build()
        .context("failed to build relaxed author pattern")?
        .find(&folded);

    let (kind, in_text) = match loose_match {
        Some(m) => (
            ProblemKind::AuthorMismatchCasePunctAccent,
            &text[origin[m.start()]..origin[m.end()]],
        ),
        None => (ProblemKind::AuthorMismatch, text),
    };
    Ok(Some((kind, format!("meta=\"{}\"\npdf =\"{in_text}\"", names.join(" ")))))
}

/// Whitespace and the TeX characters `{}$^` are ignored, as is case.
pub fn title_problem(title: &str, text: &str) -> Result<Option<Problem>> {
    let pattern = title
        .replace("--", "-")
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '{' | '}' | '$' | '^'))
        .map(|c| regex::escape(&c.to_string()))
        .collect::<Vec<_>>()
        .join(r"\s*");
    let matched = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .context("failed to build title pattern")?
        .is_match(text);
    if matched {
        Ok(None)
    } else {
        Ok(Some((ProblemKind::Title, format!("meta=\"{title}\"\npdf =\"{text}\""))))
    }
}

pub fn copyright_problems(signature: &str, org_name: &str, org_address: &str) -> Vec<Problem> {
    let mut messages = Vec::new();
    if signature.is_empty() {
        messages.push("The signature is missing.".to_string());
    } else if signature == "NA" {
        messages.push(format!(
            "The signature \"{signature}\" must be accompanied by a \"License to Publish\" or equivalent."
        ));
    } else if signature.chars().count() < 3 || signature.split_whitespace().count() < 2 {
        messages.push(format!("The signature \"{signature}\" does not appear to be a full name."));
    }

    if org_name.is_empty() {
        messages.push("The organization name is missing.".to_string());
    } else if org_name.chars().count() < 5 && !SHORT_ORG_NAMES.contains(&org_name) {
        messages.push(format!(
            "The organization name \"{org_name}\" does not appear to be a full name. "
        ));
    }

    if org_address.is_empty() {
        messages.push("The organization address is missing.".to_string());
    } else if org_address.chars().count() < 3 || org_address.split_whitespace().count() < 2 {
        messages.push(format!(
            "The organization address \"{}\" does not appear to be a complete physical address.",
            org_address.replace('\n', " ")
        ));
    }

    messages.into_iter().map(|m| (ProblemKind::Copyright, m)).collect()
}

/// Every problem of one submission, authors first, then title, then copyright.
pub fn check_record(record: &SubmissionRecord, header_text: &str) -> Result<Vec<Problem>> {
    let title = clean_str(record.field("Title"));
    let mut problems = Vec::new();
    problems.extend(author_problem(&record.author_tokens(), header_text)?);
    problems.extend(title_problem(&title, header_text)?);
    problems.extend(copyright_problems(
        &clean_str(record.field("copyrightSig")),
        &clean_str(record.field("orgName")),
        &clean_str(record.field("orgAddress")),
    ));
    Ok(problems)
}

/// Cleaned leading text of the first page, where title and authors live.
pub fn header_text(doc: &Document) -> String {
    let Some(first) = doc.pages.first() else {
        return String::new();
    };
    match &first.content {
        Ok(content) => clean_str(&content.text().chars().take(HEADER_CHARS).collect::<String>()),
        Err(err) => {
            warn!(pdf = %doc.path.display(), error = %err, "first page is unreadable");
            String::new()
        }
    }
}

/// Maps submission ids to their `{id}_Paper.pdf` under `dir`.
pub fn index_pdfs(dir: &Path) -> Result<HashMap<u64, PathBuf>> {
    let mut index = HashMap::new();
    for path in collect_pdfs(&[dir.to_path_buf()])? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(prefix) = name.strip_suffix("_Paper.pdf") else {
            continue;
        };
        let id = prefix.split('_').next().unwrap_or(prefix);
        match id.parse::<u64>() {
            Ok(id) => {
                index.insert(id, path.clone());
            }
            Err(_) => debug!(pdf = %path.display(), "skipping file without numeric id"),
        }
    }
    Ok(index)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataReport {
    pub problems: BTreeMap<u64, BTreeMap<ProblemKind, Vec<String>>>,
    /// Spreadsheet row of each submission; row 1 is the header.
    pub sheet_rows: BTreeMap<u64, usize>,
}

impl MetadataReport {
    pub fn record(&mut self, submission_id: u64, problems: Vec<Problem>) {
        for (kind, text) in problems {
            self.problems
                .entry(submission_id)
                .or_default()
                .entry(kind)
                .or_default()
                .push(text);
        }
    }

    pub fn failed(&self) -> usize {
        self.problems.len()
    }

    /// Number of submissions showing each kind of problem.
    pub fn counts(&self) -> BTreeMap<ProblemKind, usize> {
        let mut counts = BTreeMap::new();
        for kinds in self.problems.values() {
            for kind in kinds.keys() {
                *counts.entry(*kind).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (id, kinds) in &self.problems {
            for (kind, texts) in kinds {
                let _ = writeln!(out, "{id}:{kind}:\n{}\n", indent(&texts.join("\n"), "  "));
            }
        }
        let _ = writeln!(out, "{} submissions failed:", self.failed());
        for (kind, count) in self.counts() {
            let _ = writeln!(out, "  {count} {kind}");
        }
        out
    }
}

pub fn check_metadata(
    records: &[SubmissionRecord],
    pdfs_dir: &Path,
    backend: &dyn PdfBackend,
) -> Result<MetadataReport> {
    let pdfs = index_pdfs(pdfs_dir)?;
    let mut report = MetadataReport::default();

    for record in records {
        let id = record.submission_id;
        report.sheet_rows.insert(id, record.row + 1);

        let pdf_path = pdfs
            .get(&id)
            .with_context(|| format!("no {id}_Paper.pdf under {}", pdfs_dir.display()))?;
        let doc = backend
            .load(pdf_path)
            .with_context(|| format!("failed to load {}", pdf_path.display()))?;
        let problems = check_record(record, &header_text(&doc))?;
        debug!(submission = id, problems = problems.len(), "metadata checked");
        report.record(id, problems);
    }

    info!(submissions = records.len(), failed = report.failed(), "metadata check finished");
    Ok(report)
}

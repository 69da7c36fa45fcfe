use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::metadata::{indent, SubmissionRecord, MAX_AUTHORS, NAME_PARTS};

const SEPARATOR: &str = "=================================================================";

/// `Name (Affiliation)` for every filled author slot.
fn author_lines(record: &SubmissionRecord) -> Vec<String> {
    (1..=MAX_AUTHORS)
        .filter_map(|author| {
            let name = NAME_PARTS
                .iter()
                .map(|part| record.name_part(author, part).trim())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if name.is_empty() {
                None
            } else {
                Some(format!("{name} ({})", record.affiliation(author).trim()))
            }
        })
        .collect()
}

/// All copyright signatures in the standard transfer block format.
pub fn render_signatures(records: &[SubmissionRecord]) -> String {
    let pad = " ".repeat(4);
    let mut out = String::new();
    for record in records {
        let field = |name: &str| record.field(name).trim().to_string();
        let _ = write!(
            out,
            "\nSubmission # {id}\n\
             Title: {title}\n\
             Authors:\n\
             {authors}\n\
             Signature: {signature}\n\
             Your job title (if not one of the authors): {job}\n\
             Name and address of your organization:\n\
             {org_name}\n\
             {org_address}\n\
             \n\
             {SEPARATOR}\n",
            id = record.submission_id,
            title = record.field("Title"),
            authors = indent(&author_lines(record).join("\n"), &pad),
            signature = field("copyrightSig"),
            job = field("jobTitle"),
            org_name = indent(&field("orgName"), &pad),
            org_address = indent(&field("orgAddress"), &pad),
        );
    }
    out
}

pub fn write_signatures(records: &[SubmissionRecord], output: &Path) -> Result<()> {
    fs::write(output, render_signatures(records))
        .with_context(|| format!("failed to write {}", output.display()))
}

use std::fmt::Write as _;

use anyhow::Result;
use colored::Colorize;

use crate::checks::bibliography::NameCheckStatus;
use crate::core::report::{Category, CheckReport};
use crate::export::Exporter;

const ADVICE: &[&str] = &[
    "In general, it is required that you fix errors for your paper to be published. Fixing warnings is optional, but recommended.",
    "Important: Some of the margin errors may be spurious. The library detects the location of images, but not whether they have a white background that blends in.",
    "Important: Some of the warnings generated for citations may be spurious and inaccurate, due to parsing and indexing errors.",
    "We encourage you to double check the citations and update them depending on the latest source. If you believe that your citation is updated and correct, then please ignore those warnings.",
];

fn plural(n: usize, singular: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {singular}s")
    }
}

fn label(category: Category) -> String {
    if category == Category::Parsing {
        "Parsing Error:".yellow().to_string()
    } else if category.is_warning() {
        format!("Warning ({category}):").yellow().to_string()
    } else {
        format!("Error ({category}):").red().to_string()
    }
}

/// Human-readable breakdown of one report.
pub fn render_summary(submission_id: &str, report: &CheckReport, name_check: NameCheckStatus) -> String {
    let mut out = String::new();
    if name_check == NameCheckStatus::Skipped {
        let _ = writeln!(out, "Note: the reference name check was skipped.");
    }
    if report.is_empty() {
        let _ = writeln!(out, "{}", "All Clear!".green());
        return out;
    }

    let _ = writeln!(out, "Errors. Check errors-{submission_id}.json for details.");
    for (category, messages) in &report.findings {
        for message in messages {
            let _ = writeln!(out, "{} {message}", label(*category));
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "We detected {} and {} in your paper.",
        plural(report.errors, "error"),
        plural(report.warnings, "warning")
    );
    for line in ADVICE {
        let _ = writeln!(out, "{line}");
    }
    out
}

/// Prints the summary to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleExporter {
    pub name_check: NameCheckStatus,
}

impl Exporter for ConsoleExporter {
    fn export(&self, submission_id: &str, report: &CheckReport) -> Result<()> {
        print!("{}", render_summary(submission_id, report, self.name_check));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::Findings;

    #[test]
    fn clean_report_is_all_clear() {
        let report = CheckReport::from_findings(Findings::new());
        let text = render_summary("1", &report, NameCheckStatus::NotRequested);
        assert!(text.contains("All Clear!"));
        assert!(!text.contains("We detected"));
    }

    #[test]
    fn counts_use_singular_and_plural() {
        let mut findings = Findings::new();
        findings.insert(Category::Margin, vec!["Text on page 1 bleeds into the top margin.".into()]);
        findings.insert(Category::Parsing, vec!["Error occurs when parsing page [2].".into()]);
        findings.insert(
            Category::Bibliography,
            vec!["Couldn't find any references.".into(), "Only 0 links found.".into()],
        );
        let report = CheckReport::from_findings(findings);
        let text = render_summary("1", &report, NameCheckStatus::NotRequested);

        assert!(text.contains("Error (Margin):"));
        assert!(text.contains("Parsing Error:"));
        assert!(text.contains("Warning (Bibliography):"));
        assert!(text.contains("We detected 1 error and 2 warnings in your paper."));
        assert!(text.contains("errors-1.json"));
    }

    #[test]
    fn skipped_name_check_is_noted() {
        let report = CheckReport::from_findings(Findings::new());
        let text = render_summary("1", &report, NameCheckStatus::Skipped);
        assert!(text.starts_with("Note: the reference name check was skipped."));
    }
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Size,
    Parsing,
    Margin,
    Spelling,
    Font,
    #[serde(rename = "Page Limit")]
    PageLimit,
    Bibliography,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Size => "Size",
            Category::Parsing => "Parsing",
            Category::Margin => "Margin",
            Category::Spelling => "Spelling",
            Category::Font => "Font",
            Category::PageLimit => "Page Limit",
            Category::Bibliography => "Bibliography",
        }
    }

    /// Warnings are advisory; everything else is an error.
    pub fn is_warning(self) -> bool {
        matches!(self, Category::Bibliography)
    }

    /// Errors that make a paper incorrect. Parsing problems are reported
    /// but never fail the paper on their own.
    pub fn is_blocking(self) -> bool {
        !self.is_warning() && self != Category::Parsing
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Messages grouped by category, in insertion order within each category.
pub type Findings = BTreeMap<Category, Vec<String>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckReport {
    pub correct: bool,
    pub findings: Findings,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckReport {
    pub fn from_findings(findings: Findings) -> Self {
        let mut errors = 0;
        let mut warnings = 0;
        for (category, messages) in &findings {
            if category.is_blocking() {
                errors += messages.len();
            } else if category.is_warning() {
                warnings += messages.len();
            }
        }
        Self {
            correct: errors == 0,
            findings,
            errors,
            warnings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.findings.values().all(Vec::is_empty)
    }

    pub fn messages(&self, category: Category) -> &[String] {
        self.findings
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The persisted log: category display name to messages.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn findings(entries: &[(Category, &str)]) -> Findings {
        let mut out = Findings::new();
        for (category, message) in entries {
            out.entry(*category).or_default().push(message.to_string());
        }
        out
    }

    #[test]
    fn parsing_and_warnings_do_not_fail_paper() {
        let report = CheckReport::from_findings(findings(&[
            (Category::Parsing, "Error occurs when parsing page [2]."),
            (Category::Bibliography, "Couldn't find any references."),
        ]));
        assert!(report.correct);
        assert_eq!(report.errors, 0);
        assert_eq!(report.warnings, 1);
    }

    #[test]
    fn margin_error_fails_paper() {
        let report = CheckReport::from_findings(findings(&[
            (Category::Margin, "Text on page 1 bleeds into the right margin."),
            (Category::Margin, "An image on page 2 bleeds into the top margin."),
        ]));
        assert!(!report.correct);
        assert_eq!(report.errors, 2);
        assert_eq!(report.messages(Category::Margin).len(), 2);
        assert!(report.messages(Category::Font).is_empty());
    }

    #[test]
    fn json_uses_display_names() {
        let report = CheckReport::from_findings(findings(&[(
            Category::PageLimit,
            "Paper exceeds the page limit",
        )]));
        assert_eq!(
            report.to_json().unwrap(),
            r#"{"Page Limit":["Paper exceeds the page limit"]}"#
        );
    }
}

//! Compares the author lists a paper cites with the lists a bibliography
//! normalization service returns for the same references.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::core::text::comparison_key;

/// One cited reference before and after normalization. Each author is a list
/// of name parts, first names first and the last name last.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NormalizedReference {
    pub old_authors: Vec<Vec<String>>,
    pub new_authors: Vec<Vec<String>>,
    pub title: String,
    pub url: Option<String>,
}

/// Extracts the bibliography of a PDF and normalizes it against a canonical
/// database.
pub trait ReferenceNormalizer: Send + Sync {
    fn normalize(&self, pdf_path: &Path) -> Result<Vec<NormalizedReference>>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameCheckConfig {
    /// Compare every name part instead of only first and last names.
    pub whole_name: bool,
    pub first_name: bool,
    pub last_name: bool,
    /// Accept initials in place of first names.
    pub initials: bool,
    /// Append the expected and cited names to each warning.
    pub show_names: bool,
}

impl Default for NameCheckConfig {
    fn default() -> Self {
        Self {
            whole_name: false,
            first_name: true,
            last_name: true,
            initials: true,
            show_names: false,
        }
    }
}

fn initial_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]\.").expect("valid initial pattern"))
}

fn names_equal(a: &[String], b: &[String]) -> bool {
    comparison_key(&a.concat()) == comparison_key(&b.concat())
}

fn first_names_equal(old: &str, new: &str, initials: bool) -> bool {
    let pattern = initial_pattern();
    if initials && (pattern.is_match(old) || pattern.is_match(new)) {
        let capitals = |s: &str| s.chars().filter(char::is_ascii_uppercase).collect::<String>();
        comparison_key(&capitals(old)) == comparison_key(&capitals(new))
    } else {
        comparison_key(old) == comparison_key(new)
    }
}

/// One warning per reference whose cited authors disagree with the
/// normalized record.
pub fn compare_references(references: &[NormalizedReference], config: &NameCheckConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    for reference in references {
        let mut parts: Vec<String> = Vec::new();
        let url_hint = reference
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| format!("Please correct the citation by visiting this url: {url}"));
        let (old, new) = (&reference.old_authors, &reference.new_authors);

        if old.len() != new.len() {
            parts.push(format!(
                "Number of authors in the title `{}` is incorrect.",
                reference.title
            ));
            parts.push(format!(
                "The number of authors should be {}, not {}.",
                new.len(),
                old.len()
            ));
            parts.extend(url_hint.clone());
        } else {
            let mut warned = false;
            for (i, (old_name, new_name)) in old.iter().zip(new.iter()).enumerate() {
                let mismatch = if config.whole_name {
                    !names_equal(old_name, new_name)
                } else {
                    let first = config.first_name
                        && !first_names_equal(
                            old_name.first().map_or("", String::as_str),
                            new_name.first().map_or("", String::as_str),
                            config.initials,
                        );
                    let last = config.last_name
                        && comparison_key(old_name.last().map_or("", String::as_str))
                            != comparison_key(new_name.last().map_or("", String::as_str));
                    first || last
                };
                if !mismatch {
                    continue;
                }
                if !warned {
                    parts.push(format!(
                        "Your citation for `{}` might have incorrect author names.",
                        reference.title
                    ));
                    parts.extend(url_hint.clone());
                    warned = true;
                }
                if config.show_names {
                    parts.push(format!(
                        "The author #{i} name should be {} not {}.",
                        new_name.join(" "),
                        old_name.join(" ")
                    ));
                }
            }
        }

        if !parts.is_empty() {
            warnings.push(parts.join(" "));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    fn reference(old: Vec<Vec<String>>, new: Vec<Vec<String>>) -> NormalizedReference {
        NormalizedReference {
            old_authors: old,
            new_authors: new,
            title: "Attention Is All You Need".to_string(),
            url: Some("https://aclanthology.org/x".to_string()),
        }
    }

    #[test]
    fn author_count_mismatch() {
        let refs = vec![reference(
            vec![name(&["Ashish", "Vaswani"])],
            vec![name(&["Ashish", "Vaswani"]), name(&["Noam", "Shazeer"])],
        )];
        assert_eq!(
            compare_references(&refs, &NameCheckConfig::default()),
            vec![
                "Number of authors in the title `Attention Is All You Need` is incorrect. \
                 The number of authors should be 2, not 1. \
                 Please correct the citation by visiting this url: https://aclanthology.org/x"
                    .to_string()
            ]
        );
    }

    #[test]
    fn initials_and_accents_match() {
        let refs = vec![reference(
            vec![name(&["J.", "Muller"]), name(&["noam", "shazeer"])],
            vec![name(&["José", "Müller"]), name(&["Noam", "Shazeer"])],
        )];
        assert!(compare_references(&refs, &NameCheckConfig::default()).is_empty());
    }

    #[test]
    fn one_warning_per_reference() {
        let refs = vec![reference(
            vec![name(&["Jon", "Smyth"]), name(&["Ann", "Lee"])],
            vec![name(&["John", "Smith"]), name(&["Anne", "Li"])],
        )];
        let config = NameCheckConfig {
            show_names: true,
            ..Default::default()
        };
        let warnings = compare_references(&refs, &config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Your citation for `Attention Is All You Need` might have incorrect author names."));
        assert!(warnings[0].contains("The author #0 name should be John Smith not Jon Smyth."));
        assert!(warnings[0].contains("The author #1 name should be Anne Li not Ann Lee."));
    }

    #[test]
    fn whole_name_mode_compares_every_part() {
        let refs = vec![reference(
            vec![name(&["Mary", "Ann", "Jones"])],
            vec![name(&["Mary", "Anne", "Jones"])],
        )];
        assert!(compare_references(&refs, &NameCheckConfig::default()).is_empty());
        let whole = NameCheckConfig {
            whole_name: true,
            ..Default::default()
        };
        assert_eq!(compare_references(&refs, &whole).len(), 1);
    }
}

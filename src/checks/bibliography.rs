use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::checks::name_check::{compare_references, NameCheckConfig, ReferenceNormalizer};
use crate::checks::CheckSession;
use crate::core::config::CheckConfig;
use crate::core::model::Document;
use crate::core::report::Category;

/// Link and mention counts from the references onward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceStats {
    pub found_references: bool,
    pub arxiv_mentions: usize,
    pub doi_links: usize,
    pub arxiv_links: usize,
    pub all_links: usize,
}

/// Counts from the first page with a `References` line to the end. Unreadable
/// pages count as empty and are reported.
pub fn collect_stats(doc: &Document, session: &mut CheckSession) -> ReferenceStats {
    let mut stats = ReferenceStats::default();
    for page in &doc.pages {
        let content = match &page.content {
            Ok(content) => Some(content),
            Err(_) => {
                session.add(Category::Bibliography, format!("Can't parse page #{}", page.number));
                None
            }
        };
        let Some(content) = content else {
            continue;
        };

        if !stats.found_references && content.lines.iter().any(|line| line.contains("References")) {
            debug!(page = page.number, "references start");
            stats.found_references = true;
        }
        if !stats.found_references {
            continue;
        }

        stats.arxiv_mentions += content.text().to_lowercase().matches("arxiv").count();
        // A link spanning two lines is reported once per line.
        let unique: BTreeSet<&str> = content.hyperlinks.iter().map(String::as_str).collect();
        for url in unique {
            if url.contains("doi.org") {
                stats.doi_links += 1;
            } else if url.contains("arxiv.org") {
                stats.arxiv_links += 1;
            }
            stats.all_links += 1;
        }
    }
    stats
}

pub fn stat_warnings(stats: &ReferenceStats, config: &CheckConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if stats.doi_links < config.min_doi_links {
        warnings.push(format!(
            "Bibliography should use ACL Anthology DOIs whenever possible. Only {} references do.",
            stats.doi_links
        ));
    }
    if stats.arxiv_links as f64 > config.max_arxiv_link_ratio * stats.all_links as f64 {
        warnings.push(format!(
            "It appears you are using arXiv links more than you should ({}/{}). Consider using ACL Anthology DOIs instead.",
            stats.arxiv_links, stats.all_links
        ));
    }
    if stats.all_links < config.min_links {
        warnings.push(format!(
            "It appears most of the references are not using paper links. Only {} links found.",
            stats.all_links
        ));
    }
    if stats.arxiv_mentions > config.max_arxiv_mentions {
        warnings.push(format!(
            "It appears you are using arXiv references more than you should ({} found). Consider using ACL Anthology references instead.",
            stats.arxiv_mentions
        ));
    }
    if !stats.found_references {
        warnings.push("Couldn't find any references.".to_string());
    }
    warnings
}

/// Optional author-name comparison against a normalization service.
pub enum NameCheck<'a> {
    Disabled,
    Enabled {
        normalizer: Option<&'a dyn ReferenceNormalizer>,
        config: NameCheckConfig,
    },
}

/// Outcome of the name check, for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCheckStatus {
    NotRequested,
    Completed,
    Skipped,
}

pub fn check_references(
    doc: &Document,
    config: &CheckConfig,
    name_check: &NameCheck<'_>,
    session: &mut CheckSession,
) -> NameCheckStatus {
    let stats = collect_stats(doc, session);

    let status = match name_check {
        NameCheck::Disabled => NameCheckStatus::NotRequested,
        NameCheck::Enabled {
            normalizer: None, ..
        } => {
            warn!(submission = %session.submission_id, "name check requested but no reference normalizer is configured");
            NameCheckStatus::Skipped
        }
        NameCheck::Enabled {
            normalizer: Some(normalizer),
            config: name_config,
        } => match normalizer.normalize(&session.pdf_path) {
            Ok(references) => {
                for warning in compare_references(&references, name_config) {
                    session.add(Category::Bibliography, warning);
                }
                NameCheckStatus::Completed
            }
            Err(err) => {
                warn!(submission = %session.submission_id, error = %err, "reference normalization failed");
                NameCheckStatus::Skipped
            }
        },
    };

    for warning in stat_warnings(&stats, config) {
        session.add(Category::Bibliography, warning);
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::name_check::NormalizedReference;
    use crate::core::model::{Page, PageContent};
    use crate::error::ExtractError;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn page(number: usize, lines: &[&str], links: &[&str]) -> Page {
        Page {
            number,
            width: 595.0,
            height: 842.0,
            content: Ok(PageContent {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                hyperlinks: links.iter().map(|l| l.to_string()).collect(),
                ..Default::default()
            }),
        }
    }

    fn doc(pages: Vec<Page>) -> Document {
        Document {
            path: "3.pdf".into(),
            pages,
        }
    }

    fn new_session() -> CheckSession {
        CheckSession::new(Path::new("3.pdf"), Path::new("."))
    }

    fn dois(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://doi.org/10.18653/v1/{i}")).collect()
    }

    #[test]
    fn counts_start_at_references() {
        let doc = doc(vec![
            page(1, &["Intro citing arXiv"], &["https://doi.org/early"]),
            page(
                2,
                &["References", "arXiv preprint arXiv:1234"],
                &[
                    "https://doi.org/a",
                    "https://doi.org/a",
                    "https://arxiv.org/abs/1",
                    "https://example.com",
                ],
            ),
            page(3, &["more ARXIV"], &["https://doi.org/b"]),
        ]);
        let stats = collect_stats(&doc, &mut new_session());
        assert_eq!(
            stats,
            ReferenceStats {
                found_references: true,
                arxiv_mentions: 3,
                doi_links: 2,
                arxiv_links: 1,
                all_links: 4,
            }
        );
    }

    #[test]
    fn doi_threshold_is_three() {
        let config = CheckConfig::default();
        let with = |doi_links| ReferenceStats {
            found_references: true,
            doi_links,
            all_links: 5,
            ..Default::default()
        };
        assert!(stat_warnings(&with(3), &config).is_empty());
        assert_eq!(
            stat_warnings(&with(2), &config),
            vec!["Bibliography should use ACL Anthology DOIs whenever possible. Only 2 references do.".to_string()]
        );
    }

    #[test]
    fn arxiv_ratio_and_mentions() {
        let stats = ReferenceStats {
            found_references: true,
            arxiv_mentions: 11,
            doi_links: 3,
            arxiv_links: 2,
            all_links: 9,
        };
        let warnings = stat_warnings(&stats, &CheckConfig::default());
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("(2/9)"));
        assert!(warnings[1].contains("(11 found)"));
    }

    #[test]
    fn missing_references_and_unreadable_pages() {
        let doc = doc(vec![Page {
            number: 1,
            width: 595.0,
            height: 842.0,
            content: Err(ExtractError::page(1, "bad")),
        }]);
        let mut session = new_session();
        check_references(&doc, &CheckConfig::default(), &NameCheck::Disabled, &mut session);
        let warnings = &session.findings()[&Category::Bibliography];
        assert_eq!(warnings.first().map(String::as_str), Some("Can't parse page #1"));
        assert_eq!(warnings.last().map(String::as_str), Some("Couldn't find any references."));
    }

    struct FixedNormalizer(Vec<NormalizedReference>);

    impl ReferenceNormalizer for FixedNormalizer {
        fn normalize(&self, _pdf_path: &Path) -> Result<Vec<NormalizedReference>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn name_check_warnings_precede_stat_warnings() {
        let links = dois(5);
        let links: Vec<&str> = links.iter().map(String::as_str).collect();
        let doc = doc(vec![page(1, &["References"], &links)]);
        let normalizer = FixedNormalizer(vec![NormalizedReference {
            old_authors: vec![vec!["A".into(), "B".into()]],
            new_authors: vec![],
            title: "T".into(),
            url: None,
        }]);
        let name_check = NameCheck::Enabled {
            normalizer: Some(&normalizer),
            config: NameCheckConfig::default(),
        };

        let mut session = new_session();
        let status = check_references(&doc, &CheckConfig::default(), &name_check, &mut session);

        assert_eq!(status, NameCheckStatus::Completed);
        assert_eq!(
            session.findings()[&Category::Bibliography],
            vec!["Number of authors in the title `T` is incorrect. The number of authors should be 0, not 1.".to_string()]
        );
    }

    #[test]
    fn missing_normalizer_is_skipped() {
        let links = dois(5);
        let links: Vec<&str> = links.iter().map(String::as_str).collect();
        let doc = doc(vec![page(1, &["References"], &links)]);
        let name_check = NameCheck::Enabled {
            normalizer: None,
            config: NameCheckConfig::default(),
        };
        let mut session = new_session();
        let status = check_references(&doc, &CheckConfig::default(), &name_check, &mut session);
        assert_eq!(status, NameCheckStatus::Skipped);
        assert!(session.findings().is_empty());
    }
}

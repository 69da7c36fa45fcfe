use crate::checks::CheckSession;
use crate::core::config::PaperType;
use crate::core::model::Document;
use crate::core::report::Category;

/// Section headings that mark the end of the page-limited content.
pub const END_OF_CONTENT_MARKERS: &[&str] = &[
    "References",
    "Acknowledgments",
    "Acknowledgement",
    "Acknowledgment",
    "Ethics Statement",
    "EthicsStatement",
    "Ethical Considerations",
    "EthicalConsiderations",
    "Ethicalconsiderations",
    "Broader Impact",
    "BroaderImpact",
    "Ethical Concerns",
    "EthicalConcerns",
];

/// First `(page, line)`, both 1-based, whose line contains a marker.
pub fn first_marker(doc: &Document, session: &CheckSession) -> Option<(usize, usize)> {
    for page in &doc.pages {
        if session.is_excluded(page.number) {
            continue;
        }
        let Ok(content) = &page.content else {
            continue;
        };
        let hit = content
            .lines
            .iter()
            .position(|line| END_OF_CONTENT_MARKERS.iter().any(|m| line.contains(m)));
        if let Some(idx) = hit {
            return Some((page.number, idx + 1));
        }
    }
    None
}

/// Flags papers whose references start after the first line of the page
/// following the limit.
pub fn check_page_limit(doc: &Document, paper_type: PaperType, session: &mut CheckSession) {
    let Some(threshold) = paper_type.page_limit() else {
        return;
    };
    if doc.page_count() <= threshold {
        return;
    }
    let Some((page, line)) = first_marker(doc, session) else {
        return;
    };
    if (page, line) > (threshold + 1, 1) {
        session.add(
            Category::PageLimit,
            format!(
                "Paper exceeds the page limit because first (References, Acknowledgments, \
                 Ethics Statement) was found on page {page}, line {line}."
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Page, PageContent};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn paper(pages: usize, marker: Option<(usize, usize)>) -> Document {
        let pages = (1..=pages)
            .map(|number| {
                let mut lines: Vec<String> = (1..=40).map(|i| format!("body line {i}")).collect();
                if let Some((page, line)) = marker {
                    if page == number {
                        lines[line - 1] = "References".to_string();
                    }
                }
                Page {
                    number,
                    width: 595.0,
                    height: 842.0,
                    content: Ok(PageContent {
                        lines,
                        ..Default::default()
                    }),
                }
            })
            .collect();
        Document {
            path: "5.pdf".into(),
            pages,
        }
    }

    fn run(doc: &Document, paper_type: PaperType) -> Vec<String> {
        let mut session = CheckSession::new(Path::new("5.pdf"), Path::new("."));
        check_page_limit(doc, paper_type, &mut session);
        session
            .findings()
            .get(&Category::PageLimit)
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn short_documents_pass_trivially() {
        assert!(run(&paper(9, Some((9, 30))), PaperType::Long).is_empty());
    }

    #[test]
    fn missing_marker_is_not_an_error() {
        assert!(run(&paper(12, None), PaperType::Long).is_empty());
    }

    #[test]
    fn marker_on_first_line_after_limit_passes() {
        assert!(run(&paper(12, Some((10, 1))), PaperType::Long).is_empty());
    }

    #[test]
    fn marker_later_fails() {
        assert_eq!(
            run(&paper(12, Some((11, 1))), PaperType::Long),
            vec![
                "Paper exceeds the page limit because first (References, Acknowledgments, \
                 Ethics Statement) was found on page 11, line 1."
                    .to_string()
            ]
        );
        assert_eq!(run(&paper(12, Some((10, 2))), PaperType::Long).len(), 1);
        assert_eq!(run(&paper(8, Some((7, 1))), PaperType::Short).len(), 1);
    }

    #[test]
    fn other_papers_are_unbounded() {
        assert!(run(&paper(40, Some((39, 1))), PaperType::Other).is_empty());
    }

    #[test]
    fn excluded_pages_are_skipped() {
        let doc = paper(12, Some((10, 1)));
        let mut session = CheckSession::new(Path::new("5.pdf"), Path::new("."));
        session.exclude_page(10);
        assert_eq!(first_marker(&doc, &session), None);
    }

    #[test]
    fn markers_are_case_sensitive() {
        let mut doc = paper(12, None);
        if let Ok(content) = &mut doc.pages[10].content {
            content.lines[0] = "references".to_string();
        }
        let session = CheckSession::new(Path::new("5.pdf"), Path::new("."));
        assert_eq!(first_marker(&doc, &session), None);
    }
}

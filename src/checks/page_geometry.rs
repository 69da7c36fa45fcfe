//! Page size and margin checks.
//!
//! Coordinates are page points with the origin at the top-left corner. A
//! glyph box is classified against the TOP, LEFT and RIGHT bands in that
//! order; the bottom margin is not inspected.

use std::path::Path;
use tracing::{debug, warn};

use crate::checks::CheckSession;
use crate::core::config::CheckConfig;
use crate::core::geometry::BBox;
use crate::core::model::{Document, GlyphBox, GlyphKind, MarginSide, Violation};
use crate::core::report::Category;
use crate::render::annotate::{outline_regions, save_png};
use crate::render::Rasterizer;

pub struct PageGeometryChecker<'a> {
    config: &'a CheckConfig,
    rasterizer: &'a dyn Rasterizer,
}

impl<'a> PageGeometryChecker<'a> {
    pub fn new(config: &'a CheckConfig, rasterizer: &'a dyn Rasterizer) -> Self {
        Self { config, rasterizer }
    }

    /// Size check, margin scan, then evidence rendering.
    pub fn run(&self, doc: &Document, session: &mut CheckSession) -> Vec<Violation> {
        self.check_page_size(doc, session);
        let violations = self.scan_margins(doc, session);
        self.report(&violations, session);
        violations
    }

    pub fn check_page_size(&self, doc: &Document, session: &mut CheckSession) {
        // Ties go to the even point, so 842.5 still counts as 842.
        let target = (
            self.config.page_width.round_ties_even(),
            self.config.page_height.round_ties_even(),
        );
        for page in &doc.pages {
            if (page.width.round_ties_even(), page.height.round_ties_even()) != target {
                session.add(Category::Size, format!("Page #{} is not A4.", page.number));
                session.exclude_page(page.number);
            }
        }
    }

    /// Finds visible content inside the margin bands of every page still in play.
    ///
    /// Pages whose content could not be extracted are excluded afterwards and
    /// reported together as one parsing finding.
    pub fn scan_margins(&self, doc: &Document, session: &mut CheckSession) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut failed = Vec::new();

        for page in &doc.pages {
            if session.is_excluded(page.number) {
                continue;
            }
            let content = match &page.content {
                Ok(content) => content,
                Err(err) => {
                    debug!(page = page.number, error = %err, "skipping unparsable page");
                    failed.push(page.number);
                    continue;
                }
            };

            let candidates = content
                .images
                .iter()
                .chain(content.words.iter().filter(|w| is_suspicious_word(w)));
            for glyph in candidates {
                let Some(side) = self.classify(&glyph.bbox, page.width) else {
                    continue;
                };
                if glyph.kind == GlyphKind::Text && !within_page_span(&glyph.bbox, page.width) {
                    continue;
                }
                let Some(region) = self.visible_region(side, &glyph.bbox, page.width, page.height) else {
                    continue;
                };
                if self.is_invisible(&session.pdf_path, page.number, &region) {
                    debug!(page = page.number, %side, ?region, "region matches background");
                    continue;
                }
                debug!(page = page.number, %side, ?region, kind = ?glyph.kind, "margin violation");
                violations.push(Violation {
                    page: page.number,
                    glyph: glyph.clone(),
                    side,
                    region,
                });
            }
        }

        if !failed.is_empty() {
            session.add(
                Category::Parsing,
                format!("Error occurs when parsing page {failed:?}."),
            );
            for page in failed {
                session.exclude_page(page);
            }
        }
        violations
    }

    /// First band the box intrudes into, checked TOP, LEFT, RIGHT.
    pub fn classify(&self, bbox: &BBox, page_width: f64) -> Option<MarginSide> {
        if bbox.bottom.trunc() > 0.0 && bbox.top < self.config.top_limit() {
            Some(MarginSide::Top)
        } else if bbox.x1.trunc() > 0.0 && bbox.x0 < self.config.left_limit() {
            Some(MarginSide::Left)
        } else if bbox.x0.trunc() < page_width && page_width - bbox.x1 < self.config.right_limit() {
            Some(MarginSide::Right)
        } else {
            None
        }
    }

    /// The part of the box that is on the page and inside the offending band.
    /// Slivers of one point or less yield `None`.
    pub fn visible_region(&self, side: MarginSide, bbox: &BBox, page_width: f64, page_height: f64) -> Option<BBox> {
        let config = self.config;

        let mut x0 = bbox.x0.trunc().max(0.0);
        if side == MarginSide::Right {
            x0 = x0.max(page_width - config.side_margin + config.right_offset);
        }
        let mut x1 = bbox.x1.trunc().min(page_width);
        if side == MarginSide::Left {
            x1 = x1.min(config.left_limit());
        }
        let y0 = bbox.top.trunc().max(0.0);
        let mut y1 = bbox.bottom.trunc().min(page_height);
        if side == MarginSide::Top {
            y1 = y1.min(config.top_limit());
        }

        let region = BBox::new(x0, y0, x1, y1);
        region.exceeds(1.0).then_some(region)
    }

    /// True when every sampled pixel equals the background. A failed sample
    /// keeps the candidate.
    fn is_invisible(&self, pdf_path: &Path, page: usize, region: &BBox) -> bool {
        let background = self.config.background_color;
        match self
            .rasterizer
            .render_region(pdf_path, page, region, self.config.sample_dpi)
        {
            Ok(image) => image.pixels().all(|px| px.0.iter().all(|c| *c == background)),
            Err(err) => {
                warn!(page, error = %err, "region sampling failed; keeping candidate");
                false
            }
        }
    }

    /// Emits one margin finding per violation and writes one annotated image
    /// per affected page. Images that cannot be rendered or written are
    /// skipped with a warning.
    pub fn report(&self, violations: &[Violation], session: &mut CheckSession) {
        let mut pages: Vec<usize> = violations.iter().map(|v| v.page).collect();
        pages.sort_unstable();
        pages.dedup();

        for page in pages {
            let on_page: Vec<&Violation> = violations.iter().filter(|v| v.page == page).collect();
            let (text, images): (Vec<&Violation>, Vec<&Violation>) = on_page
                .into_iter()
                .partition(|v| v.glyph.kind == GlyphKind::Text);
            for v in &text {
                session.add(
                    Category::Margin,
                    format!("Text on page {page} bleeds into the {} margin.", v.side),
                );
            }
            for v in &images {
                session.add(
                    Category::Margin,
                    format!("An image on page {page} bleeds into the {} margin.", v.side),
                );
            }

            let regions: Vec<BBox> = text.iter().chain(images.iter()).map(|v| v.region).collect();
            self.annotate_page(session, page, &regions);
        }
    }

    fn annotate_page(&self, session: &CheckSession, page: usize, regions: &[BBox]) {
        let dpi = self.config.render_dpi;
        let mut image = match self.rasterizer.render_page(&session.pdf_path, page, dpi) {
            Ok(image) => image,
            Err(err) => {
                warn!(page, error = %err, "could not render page for annotation");
                return;
            }
        };
        outline_regions(
            &mut image,
            regions,
            dpi,
            self.config.annotation_padding,
            self.config.annotation_stroke,
        );
        let file_name = format!("errors-{}-page-{page}.png", session.submission_id);
        if let Err(err) = save_png(&image, &session.output_dir.join(file_name)) {
            warn!(page, error = %err, "could not write annotated page");
        }
    }
}

/// Ordinary body text is painted in pure black or without any color state.
fn is_suspicious_word(word: &GlyphBox) -> bool {
    if word.fill.is_some_and(|c| c.is_pure_black()) {
        return false;
    }
    word.fill.is_some() || word.stroke.is_some()
}

fn within_page_span(bbox: &BBox, page_width: f64) -> bool {
    bbox.x0.trunc() < page_width && bbox.x1.trunc() >= 0.0 && bbox.bottom.trunc() >= 0.0
}

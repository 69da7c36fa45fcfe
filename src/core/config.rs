use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Venue layout rules and the tolerances used when enforcing them.
///
/// All lengths are PDF points (1/72 inch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckConfig {
    /// Expected page width; 595pt is 21cm (A4).
    pub page_width: f64,
    /// Expected page height; 842pt is 29.7cm (A4).
    pub page_height: f64,
    /// Top margin reference line; 57pt is 2cm.
    pub top_margin: f64,
    /// Left and right margin reference line; 71pt is 2.5cm.
    pub side_margin: f64,
    pub top_offset: f64,
    pub left_offset: f64,
    pub right_offset: f64,
    /// Gray level of the page background. A candidate region whose pixels
    /// all equal this value is invisible and not reported.
    pub background_color: u8,
    /// Resolution used when sampling a candidate region.
    pub sample_dpi: u32,
    /// Resolution of the annotated page images.
    pub render_dpi: u32,
    pub annotation_padding: f64,
    pub annotation_stroke: u32,
    /// Acceptable main fonts, matched as a suffix of the font name so that
    /// subset prefixes like `ABCDEF+` are ignored.
    pub allowed_fonts: Vec<String>,
    /// Minimum share of all characters the main font must cover.
    pub main_font_ratio: f64,
    pub min_doi_links: usize,
    pub max_arxiv_link_ratio: f64,
    pub min_links: usize,
    pub max_arxiv_mentions: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            page_width: 595.0,
            page_height: 842.0,
            top_margin: 57.0,
            side_margin: 71.0,
            top_offset: 1.0,
            left_offset: 2.0,
            right_offset: 4.5,
            background_color: 255,
            sample_dpi: 100,
            render_dpi: 150,
            annotation_padding: 20.0,
            annotation_stroke: 5,
            allowed_fonts: vec![
                "NimbusRomNo9L-Regu".to_string(),
                "TeXGyreTermesX-Regular".to_string(),
                "TimesNewRomanPSMT".to_string(),
            ],
            main_font_ratio: 0.35,
            min_doi_links: 3,
            max_arxiv_link_ratio: 0.2,
            min_links: 5,
            max_arxiv_mentions: 10,
        }
    }
}

impl CheckConfig {
    /// Camera-ready batches relax every margin by a few points.
    pub fn camera_ready() -> Self {
        Self {
            top_offset: 5.0,
            left_offset: 5.0,
            right_offset: 5.0,
            ..Self::default()
        }
    }

    pub fn top_limit(&self) -> f64 {
        self.top_margin - self.top_offset
    }

    pub fn left_limit(&self) -> f64 {
        self.side_margin - self.left_offset
    }

    pub fn right_limit(&self) -> f64 {
        self.side_margin - self.right_offset
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaperType {
    Short,
    Long,
    Other,
}

impl PaperType {
    /// Pages of content allowed before the references; `None` is unbounded.
    pub fn page_limit(self) -> Option<usize> {
        match self {
            PaperType::Short => Some(5),
            PaperType::Long => Some(9),
            PaperType::Other => None,
        }
    }
}

impl fmt::Display for PaperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaperType::Short => "short",
            PaperType::Long => "long",
            PaperType::Other => "other",
        };
        f.write_str(label)
    }
}

impl FromStr for PaperType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(PaperType::Short),
            "long" => Ok(PaperType::Long),
            "other" => Ok(PaperType::Other),
            other => Err(format!("unknown paper type: {other}")),
        }
    }
}

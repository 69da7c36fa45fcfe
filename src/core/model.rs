use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;
use crate::error::ExtractError;

/// Paint color as reported by the content stream, one variant per device space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Gray(f32),
    Rgb([f32; 3]),
    Cmyk([f32; 4]),
    /// Pattern or an operand count that maps to no device space.
    Other,
}

impl Color {
    /// Interprets color operands by arity, the way `sc`/`scn` are read.
    pub fn from_components(components: &[f32]) -> Self {
        match components {
            [g] => Color::Gray(*g),
            [r, g, b] => Color::Rgb([*r, *g, *b]),
            [c, m, y, k] => Color::Cmyk([*c, *m, *y, *k]),
            _ => Color::Other,
        }
    }

    pub fn is_pure_black(&self) -> bool {
        match self {
            Color::Gray(g) => *g == 0.0,
            Color::Rgb(rgb) => rgb.iter().all(|c| *c == 0.0),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GlyphKind {
    Text,
    Image,
}

/// One extracted word or embedded image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlyphBox {
    pub kind: GlyphKind,
    pub bbox: BBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
}

impl GlyphBox {
    pub fn word(text: impl Into<String>, bbox: BBox, fill: Option<Color>, stroke: Option<Color>) -> Self {
        Self {
            kind: GlyphKind::Text,
            bbox,
            text: Some(text.into()),
            fill,
            stroke,
        }
    }

    pub fn image(bbox: BBox) -> Self {
        Self {
            kind: GlyphKind::Image,
            bbox,
            text: None,
            fill: None,
            stroke: None,
        }
    }
}

/// A single positioned character with the font that painted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Char {
    pub text: String,
    pub bbox: BBox,
    pub fontname: String,
    pub size: f64,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
}

/// Everything the checkers read from one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContent {
    pub words: Vec<GlyphBox>,
    pub images: Vec<GlyphBox>,
    pub chars: Vec<Char>,
    /// Text lines in reading order.
    pub lines: Vec<String>,
    /// Link annotation targets, duplicates included.
    pub hyperlinks: Vec<String>,
}

impl PageContent {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub content: Result<PageContent, ExtractError>,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MarginSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl fmt::Display for MarginSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MarginSide::Top => "top",
            MarginSide::Bottom => "bottom",
            MarginSide::Left => "left",
            MarginSide::Right => "right",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub page: usize,
    pub glyph: GlyphBox,
    pub side: MarginSide,
    /// The part of the glyph that is actually visible inside the margin band.
    pub region: BBox,
}

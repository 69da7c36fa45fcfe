use crate::core::geometry::BBox;
use crate::core::model::{Char, GlyphBox, GlyphKind};
use crate::core::text::normalize_extracted;

/// Groups positioned characters into words and words into text lines.
#[derive(Debug, Clone, Copy)]
pub struct LayoutBuilder {
    /// Largest horizontal gap, in points, still joined into one word.
    pub x_tolerance: f64,
    /// Largest difference between `top` values that still counts as one line.
    pub y_tolerance: f64,
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 3.0,
        }
    }
}

impl LayoutBuilder {
    /// Words carry the colors of their characters; a color change starts a new word.
    pub fn words(&self, chars: &[Char]) -> Vec<GlyphBox> {
        let mut words = Vec::new();
        for line in self.cluster_by_top(chars, |c| c.bbox.top) {
            let mut current: Option<(String, BBox, &Char)> = None;
            for ch in line {
                if ch.text.trim().is_empty() {
                    flush(&mut current, &mut words);
                    continue;
                }
                let continues = current.as_ref().is_some_and(|(_, bbox, first)| {
                    ch.bbox.x0 <= bbox.x1 + self.x_tolerance
                        && first.fill == ch.fill
                        && first.stroke == ch.stroke
                });
                if continues {
                    if let Some((text, bbox, _)) = current.as_mut() {
                        text.push_str(&ch.text);
                        *bbox = bbox.union(&ch.bbox);
                    }
                } else {
                    flush(&mut current, &mut words);
                    current = Some((ch.text.clone(), ch.bbox, ch));
                }
            }
            flush(&mut current, &mut words);
        }
        words
    }

    /// Lines top to bottom, words joined by single spaces.
    pub fn lines(&self, words: &[GlyphBox]) -> Vec<String> {
        self.cluster_by_top(words, |w| w.bbox.top)
            .into_iter()
            .map(|line| {
                line.iter()
                    .filter(|w| w.kind == GlyphKind::Text)
                    .filter_map(|w| w.text.as_deref())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Sorts items into rows by `top`, each row ordered left to right.
    fn cluster_by_top<'a, T, F>(&self, items: &'a [T], top: F) -> Vec<Vec<&'a T>>
    where
        T: HasX0,
        F: Fn(&T) -> f64,
    {
        let mut sorted: Vec<&T> = items.iter().collect();
        sorted.sort_by(|a, b| top(*a).total_cmp(&top(*b)));

        let mut rows: Vec<Vec<&T>> = Vec::new();
        let mut last_top = f64::NEG_INFINITY;
        for item in sorted {
            let t = top(item);
            match rows.last_mut() {
                Some(row) if t - last_top <= self.y_tolerance => row.push(item),
                _ => rows.push(vec![item]),
            }
            last_top = t;
        }
        for row in &mut rows {
            row.sort_by(|a, b| a.x0().total_cmp(&b.x0()));
        }
        rows
    }
}

trait HasX0 {
    fn x0(&self) -> f64;
}

impl HasX0 for Char {
    fn x0(&self) -> f64 {
        self.bbox.x0
    }
}

impl HasX0 for GlyphBox {
    fn x0(&self) -> f64 {
        self.bbox.x0
    }
}

fn flush(current: &mut Option<(String, BBox, &Char)>, words: &mut Vec<GlyphBox>) {
    if let Some((text, bbox, first)) = current.take() {
        words.push(GlyphBox::word(normalize_extracted(&text), bbox, first.fill, first.stroke));
    }
}

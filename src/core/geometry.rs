use serde::{Deserialize, Serialize};

/// Axis-aligned box in page points with a top-left origin, the same
/// orientation the rasterizer uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Smallest box covering every point.
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bbox = BBox::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            bbox.x0 = bbox.x0.min(x);
            bbox.top = bbox.top.min(y);
            bbox.x1 = bbox.x1.max(x);
            bbox.bottom = bbox.bottom.max(y);
        }
        Some(bbox)
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grows the box by `amount` on every side.
    pub fn pad(&self, amount: f64) -> Self {
        Self {
            x0: self.x0 - amount,
            top: self.top - amount,
            x1: self.x1 + amount,
            bottom: self.bottom + amount,
        }
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            x0: self.x0 * factor,
            top: self.top * factor,
            x1: self.x1 * factor,
            bottom: self.bottom * factor,
        }
    }

    /// Both sides strictly larger than `min_side`.
    pub fn exceeds(&self, min_side: f64) -> bool {
        self.x1 - self.x0 > min_side && self.bottom - self.top > min_side
    }
}

pub mod annotate;
pub mod renderer;

pub use renderer::PopplerRasterizer;

use anyhow::Result;
use image::RgbImage;
use std::path::Path;

use crate::core::geometry::BBox;

/// Turns PDF pages, or parts of them, into pixels.
///
/// `page` is 1-based. Regions are given in top-left-origin page points.
pub trait Rasterizer: Send + Sync {
    fn render_page(&self, pdf_path: &Path, page: usize, dpi: u32) -> Result<RgbImage>;

    fn render_region(&self, pdf_path: &Path, page: usize, region: &BBox, dpi: u32) -> Result<RgbImage>;
}

/// Converts a length in points to pixels at `dpi`.
pub fn points_to_pixels(points: f64, dpi: u32) -> f64 {
    points * f64::from(dpi) / 72.0
}

use anyhow::{Context, Result};
use image::{ImageReader, RgbImage};
use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::core::geometry::BBox;
use crate::render::{points_to_pixels, Rasterizer};

/// Rasterizes through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    program: String,
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self {
            program: "pdftoppm".to_string(),
        }
    }
}

impl PopplerRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, pdf_path: &Path, page: usize, dpi: u32, crop: Option<[u32; 4]>) -> Result<RgbImage> {
        let out_dir = tempfile::tempdir().context("failed to create raster directory")?;
        let prefix = out_dir.path().join("page");
        let prefix_str = prefix
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-UTF8 output path not supported"))?;

        let mut command = Command::new(&self.program);
        command
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string());
        if let Some([x, y, w, h]) = crop {
            command
                .arg("-x")
                .arg(x.to_string())
                .arg("-y")
                .arg(y.to_string())
                .arg("-W")
                .arg(w.to_string())
                .arg("-H")
                .arg(h.to_string());
        }
        let status = command
            .arg(pdf_path)
            .arg(prefix_str)
            .status()
            .with_context(|| format!("failed to invoke {}; is poppler-utils installed?", self.program))?;

        if !status.success() {
            anyhow::bail!("{} failed with status: {status}", self.program);
        }

        // -singlefile writes `<prefix>.png` without a page suffix
        let image_path = prefix.with_extension("png");
        let image = ImageReader::open(&image_path)
            .with_context(|| format!("expected rendered image not found: {}", image_path.display()))?
            .decode()
            .with_context(|| format!("failed to decode {}", image_path.display()))?;
        Ok(image.to_rgb8())
    }
}

impl Rasterizer for PopplerRasterizer {
    fn render_page(&self, pdf_path: &Path, page: usize, dpi: u32) -> Result<RgbImage> {
        self.run(pdf_path, page, dpi, None)
    }

    fn render_region(&self, pdf_path: &Path, page: usize, region: &BBox, dpi: u32) -> Result<RgbImage> {
        let crop = crop_window(region, dpi);
        debug!(page, ?crop, "sampling region");
        self.run(pdf_path, page, dpi, Some(crop))
    }
}

/// Pixel window `[x, y, width, height]` covering `region`, at least one pixel each way.
fn crop_window(region: &BBox, dpi: u32) -> [u32; 4] {
    let x = points_to_pixels(region.x0.max(0.0), dpi).floor();
    let y = points_to_pixels(region.top.max(0.0), dpi).floor();
    let x1 = points_to_pixels(region.x1.max(0.0), dpi).ceil();
    let y1 = points_to_pixels(region.bottom.max(0.0), dpi).ceil();
    [
        x as u32,
        y as u32,
        (x1 - x).max(1.0) as u32,
        (y1 - y).max(1.0) as u32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_window_scales_points() {
        let region = BBox::new(72.0, 36.0, 144.0, 54.0);
        assert_eq!(crop_window(&region, 100), [100, 50, 100, 25]);
    }

    #[test]
    fn crop_window_is_never_empty() {
        let region = BBox::new(10.0, 10.0, 10.0, 10.0);
        let [_, _, w, h] = crop_window(&region, 72);
        assert_eq!((w, h), (1, 1));
    }

    #[test]
    fn missing_program_is_an_error() {
        let rasterizer = PopplerRasterizer::with_program("papercheck-no-such-pdftoppm");
        let result = rasterizer.render_page(Path::new("missing.pdf"), 1, 72);
        assert!(result.is_err());
    }
}

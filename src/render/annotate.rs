use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use std::path::Path;

use crate::core::geometry::BBox;
use crate::render::points_to_pixels;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Draws an unfilled rectangle whose border grows inward from `rect`.
///
/// `rect` is in pixels; parts outside the image are clipped.
pub fn draw_rect(image: &mut RgbImage, rect: &BBox, stroke: u32, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let clamp_x = |v: f64| v.round().clamp(0.0, f64::from(width)) as u32;
    let clamp_y = |v: f64| v.round().clamp(0.0, f64::from(height)) as u32;
    let (x0, x1) = (clamp_x(rect.x0), clamp_x(rect.x1));
    let (y0, y1) = (clamp_y(rect.top), clamp_y(rect.bottom));
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let stroke = stroke.max(1);
    for y in y0..y1 {
        for x in x0..x1 {
            let on_border = x < x0 + stroke || x + stroke >= x1 || y < y0 + stroke || y + stroke >= y1;
            if on_border {
                image.put_pixel(x, y, color);
            }
        }
    }
}

/// Outlines every region, given in page points, on a page rendered at `dpi`.
pub fn outline_regions(image: &mut RgbImage, regions: &[BBox], dpi: u32, padding: f64, stroke: u32) {
    let scale = points_to_pixels(1.0, dpi);
    for region in regions {
        draw_rect(image, &region.pad(padding).scale(scale), stroke, RED);
    }
}

pub fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))
}

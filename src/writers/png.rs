use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use super::{Frame, Writer, WriterKey};
use crate::config::Color;
use crate::error::Result;
use crate::layout::Rect;

/// Raster writer. Draw order: background, modules, logo, label.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngWriter;

impl PngWriter {
    /// Paint the frame onto an RGB canvas without encoding it.
    pub fn rasterize(&self, frame: &Frame<'_>) -> Result<RgbImage> {
        let plan = frame.plan;
        let config = frame.config;
        let mut canvas = RgbImage::from_pixel(
            plan.canvas_width,
            plan.canvas_height,
            Rgb(config.background_color().channels()),
        );

        let foreground = config.foreground_color();
        for (x, y, length) in frame.grid.dark_runs() {
            fill(&mut canvas, plan.run_rect(x, y, length), foreground);
        }

        if let (Some(rect), Some(path)) = (plan.logo, config.logo_path()) {
            let logo = image::open(path)?
                .resize_exact(rect.width, rect.height, FilterType::Triangle)
                .to_rgba8();
            for (lx, ly, pixel) in logo.enumerate_pixels() {
                let [r, g, b, a] = pixel.0;
                blend(&mut canvas, rect.x + lx, rect.y + ly, [r, g, b], a);
            }
        }

        if let Some(label) = &plan.label {
            let mask = frame
                .fonts
                .rasterize(&label.text, config.label_font_path(), label.font_size)?;
            for my in 0..mask.height {
                for mx in 0..mask.width {
                    let coverage = mask.at(mx, my);
                    if coverage > 0 {
                        blend(
                            &mut canvas,
                            label.bounds.x + mx,
                            label.bounds.y + my,
                            foreground.channels(),
                            coverage,
                        );
                    }
                }
            }
        }

        Ok(canvas)
    }
}

impl Writer for PngWriter {
    fn key(&self) -> WriterKey {
        WriterKey::PNG
    }

    fn content_type(&self) -> &str {
        "image/png"
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["png"]
    }

    fn render(&self, frame: &Frame<'_>) -> Result<Vec<u8>> {
        let canvas = self.rasterize(frame)?;
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

fn fill(canvas: &mut RgbImage, rect: Rect, color: Color) {
    let right = rect.right().min(canvas.width());
    let bottom = rect.bottom().min(canvas.height());
    for y in rect.y..bottom {
        for x in rect.x..right {
            canvas.put_pixel(x, y, Rgb(color.channels()));
        }
    }
}

/// Integer source-over blend; pixels outside the canvas are ignored.
fn blend(canvas: &mut RgbImage, x: u32, y: u32, source: [u8; 3], alpha: u8) {
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }
    let pixel = canvas.get_pixel_mut(x, y);
    let a = u32::from(alpha);
    for (dst, src) in pixel.0.iter_mut().zip(source) {
        *dst = ((u32::from(src) * a + u32::from(*dst) * (255 - a) + 127) / 255) as u8;
    }
}

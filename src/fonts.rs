//! Font collaborator: label metrics and glyph coverage.

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{QrError, Result};

/// Pixel extent of a laid-out label line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
    /// Distance from the top of the text box to the baseline.
    pub baseline: u32,
}

/// 8-bit coverage for a text box of `width` x `height` pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0; width as usize * height as usize],
        }
    }

    pub fn at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage[(y * self.width + x) as usize]
    }
}

pub trait FontProvider: Send + Sync {
    fn measure(&self, text: &str, font_path: &Path, font_size: u32) -> Result<TextMetrics>;

    /// Coverage mask whose dimensions equal [`FontProvider::measure`] for the same input.
    fn rasterize(&self, text: &str, font_path: &Path, font_size: u32) -> Result<GlyphMask>;
}

/// TrueType/OpenType provider backed by `ab_glyph`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrueTypeFonts;

impl TrueTypeFonts {
    fn load(font_path: &Path) -> Result<FontVec> {
        let bytes = fs::read(font_path)?;
        FontVec::try_from_vec(bytes)
            .map_err(|e| QrError::Font(format!("{}: {}", font_path.display(), e)))
    }

    /// Glyph ids with their pen x position, plus the final advance.
    fn layout<F: Font>(font: &F, scale: PxScale, text: &str) -> (Vec<(GlyphId, f32)>, f32) {
        let scaled = font.as_scaled(scale);
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;
        let mut glyphs = Vec::with_capacity(text.len());
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push((id, caret));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
        (glyphs, caret)
    }

    fn metrics_of<F: Font>(font: &F, scale: PxScale, advance: f32) -> TextMetrics {
        let scaled = font.as_scaled(scale);
        TextMetrics {
            width: advance.max(0.0).ceil() as u32,
            height: (scaled.ascent() - scaled.descent()).max(0.0).ceil() as u32,
            baseline: scaled.ascent().max(0.0).ceil() as u32,
        }
    }
}

impl FontProvider for TrueTypeFonts {
    fn measure(&self, text: &str, font_path: &Path, font_size: u32) -> Result<TextMetrics> {
        let font = Self::load(font_path)?;
        let scale = PxScale::from(font_size as f32);
        let (_, advance) = Self::layout(&font, scale, text);
        Ok(Self::metrics_of(&font, scale, advance))
    }

    fn rasterize(&self, text: &str, font_path: &Path, font_size: u32) -> Result<GlyphMask> {
        let font = Self::load(font_path)?;
        let scale = PxScale::from(font_size as f32);
        let (glyphs, advance) = Self::layout(&font, scale, text);
        let metrics = Self::metrics_of(&font, scale, advance);
        let mut mask = GlyphMask::blank(metrics.width, metrics.height);
        let baseline = font.as_scaled(scale).ascent();

        for (id, x) in glyphs {
            let glyph = id.with_scale_and_position(scale, point(x, baseline));
            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, c| {
                let px = bounds.min.x as i64 + i64::from(gx);
                let py = bounds.min.y as i64 + i64::from(gy);
                if px < 0 || py < 0 || px >= i64::from(mask.width) || py >= i64::from(mask.height) {
                    return;
                }
                let idx = (py as usize) * mask.width as usize + px as usize;
                let value = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
                mask.coverage[idx] = mask.coverage[idx].max(value);
            });
        }
        Ok(mask)
    }
}

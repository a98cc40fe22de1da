//! Result Validation - Re-Read What Was Drawn
//!
//! A decoder turns produced image bytes back into modules; the validator
//! compares them with the source grid under a mismatch policy.

use image::ImageFormat;
use serde::Serialize;
use tracing::debug;

use crate::config::{Color, Configuration, ErrorCorrectionLevel};
use crate::error::{QrError, Result};
use crate::grid::ModuleGrid;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

/// Finder patterns are seven modules wide.
const FINDER_MODULES: u32 = 7;

/// The colors modules were drawn in. Pixels are classified by which of the
/// two they are nearer to, so overlays and inverted schemes sample correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub dark: Color,
    pub light: Color,
}

impl Palette {
    pub fn of(config: &Configuration) -> Self {
        Self {
            dark: config.foreground_color(),
            light: config.background_color(),
        }
    }

    /// Ties go to light.
    pub fn is_dark(&self, pixel: [u8; 3]) -> bool {
        distance(pixel, self.dark) < distance(pixel, self.light)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self { dark: Color::BLACK, light: Color::WHITE }
    }
}

fn distance(pixel: [u8; 3], color: Color) -> u32 {
    pixel
        .iter()
        .zip(color.channels())
        .map(|(&p, c)| {
            let d = i32::from(p) - i32::from(c);
            (d * d) as u32
        })
        .sum()
}

pub trait SymbolDecoder: Send + Sync {
    fn decode(&self, image: &[u8], format: ImageFormat, palette: Palette) -> Result<ModuleGrid>;
}

/// Samples module centers of an axis-aligned, unrotated symbol.
///
/// The module pitch is read from the top-left finder pattern and the grid
/// side from the extent of the top row, so label bands below the symbol and
/// quiet zones of any width are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct SamplingDecoder;

impl SymbolDecoder for SamplingDecoder {
    fn decode(&self, image: &[u8], format: ImageFormat, palette: Palette) -> Result<ModuleGrid> {
        if palette.dark == palette.light {
            return Err(QrError::Decode("foreground and background colors are identical".to_string()));
        }
        let rgb = image::load_from_memory_with_format(image, format)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        let dark = |x: u32, y: u32| palette.is_dark(rgb.get_pixel(x, y).0);

        let (top, left) = (0..height)
            .find_map(|y| (0..width).find(|&x| dark(x, y)).map(|x| (y, x)))
            .ok_or_else(|| QrError::Decode("no dark modules found".to_string()))?;

        let run = (left..width).take_while(|&x| dark(x, top)).count() as u32;
        if run == 0 || run % FINDER_MODULES != 0 {
            return Err(QrError::Decode(format!("finder pattern run of {} pixels", run)));
        }
        let module = run / FINDER_MODULES;

        let right = (left..width)
            .rev()
            .find(|&x| dark(x, top))
            .unwrap_or(left);
        let extent = right - left + 1;
        if extent % module != 0 {
            return Err(QrError::Decode(format!(
                "top row extent {} is not a multiple of module size {}",
                extent, module
            )));
        }
        let side = extent / module;

        let mut modules = Vec::with_capacity((side * side) as usize);
        for y in 0..side {
            for x in 0..side {
                let px = left + x * module + module / 2;
                let py = top + y * module + module / 2;
                if px >= width || py >= height {
                    return Err(QrError::Decode(format!("module ({}, {}) lies outside the image", x, y)));
                }
                modules.push(dark(px, py));
            }
        }
        debug!(side, module, "sampled symbol");
        ModuleGrid::new(side as usize, modules)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Any differing module fails.
    Exact,
    /// Tolerate as many differing modules as the level can recover.
    RecoveryBudget(ErrorCorrectionLevel),
}

impl MismatchPolicy {
    pub fn budget(self, module_count: usize) -> usize {
        match self {
            Self::Exact => 0,
            Self::RecoveryBudget(level) => module_count * level.recovery_percent() as usize / 100,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleMismatch {
    pub x: usize,
    pub y: usize,
    pub expected_dark: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub expected_side: usize,
    pub decoded_side: usize,
    pub budget: usize,
    pub mismatches: Vec<ModuleMismatch>,
}

impl ValidationReport {
    pub fn first_mismatch(&self) -> Option<(usize, usize)> {
        self.mismatches.first().map(|m| (m.x, m.y))
    }
}

pub struct ResultValidator {
    decoder: Box<dyn SymbolDecoder>,
}

impl ResultValidator {
    pub fn new(decoder: Box<dyn SymbolDecoder>) -> Self {
        Self { decoder }
    }

    /// Compare without failing; the report lists every mismatch.
    pub fn inspect(
        &self,
        image: &[u8],
        format: ImageFormat,
        palette: Palette,
        expected: &ModuleGrid,
        policy: MismatchPolicy,
    ) -> Result<ValidationReport> {
        let decoded = self.decoder.decode(image, format, palette)?;
        let mismatches: Vec<_> = expected
            .mismatches(&decoded)
            .into_iter()
            .map(|(x, y)| ModuleMismatch { x, y, expected_dark: expected.is_dark(x, y) })
            .collect();
        let budget = if decoded.side() == expected.side() {
            policy.budget(expected.side() * expected.side())
        } else {
            0
        };
        Ok(ValidationReport {
            valid: mismatches.len() <= budget,
            expected_side: expected.side(),
            decoded_side: decoded.side(),
            budget,
            mismatches,
        })
    }

    /// Fail with the first mismatched coordinate when the policy is exceeded.
    pub fn check(
        &self,
        image: &[u8],
        format: ImageFormat,
        palette: Palette,
        expected: &ModuleGrid,
        policy: MismatchPolicy,
    ) -> Result<ValidationReport> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let report = self.inspect(image, format, palette, expected, policy)?;
        if !report.valid {
            let (x, y) = report.first_mismatch().unwrap_or((0, 0));
            return Err(QrError::Validation { x, y, mismatches: report.mismatches.len() });
        }
        debug!(
            mismatches = report.mismatches.len(),
            budget = report.budget,
            "rendered symbol validated"
        );
        Ok(report)
    }
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::new(Box::new(SamplingDecoder))
    }
}

impl std::fmt::Debug for ResultValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{QrSymbolEncoder, SymbolEncoder};
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    const GREY: Color = Color::rgb(150, 150, 150);

    fn symbol() -> ModuleGrid {
        QrSymbolEncoder
            .encode("HELLO WORLD", ErrorCorrectionLevel::Low, "UTF-8")
            .unwrap()
    }

    fn encode_png(img: RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn paint(grid: &ModuleGrid, module: u32, quiet: u32, palette: Palette) -> RgbImage {
        let side = grid.side() as u32 * module + 2 * quiet;
        RgbImage::from_fn(side, side, |x, y| {
            let inside = x >= quiet && y >= quiet && x < side - quiet && y < side - quiet;
            if inside && grid.is_dark(((x - quiet) / module) as usize, ((y - quiet) / module) as usize) {
                Rgb(palette.dark.channels())
            } else {
                Rgb(palette.light.channels())
            }
        })
    }

    fn draw(grid: &ModuleGrid, module: u32, quiet: u32) -> Vec<u8> {
        let palette = Palette { dark: Color::rgb(20, 20, 20), light: Color::rgb(235, 235, 235) };
        encode_png(paint(grid, module, quiet, palette))
    }

    #[test]
    fn test_sampling_round_trip() {
        let grid = symbol();
        let decoded = SamplingDecoder
            .decode(&draw(&grid, 5, 12), ImageFormat::Png, Palette::default())
            .unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_flipped_module_fails_exact() {
        let grid = symbol();
        let mut rows: Vec<Vec<bool>> = (0..21)
            .map(|y| (0..21).map(|x| grid.is_dark(x, y)).collect())
            .collect();
        rows[10][12] = !rows[10][12];
        let tampered = ModuleGrid::from_rows(&rows).unwrap();
        let image = draw(&tampered, 4, 0);

        let validator = ResultValidator::default();
        let err = validator
            .check(&image, ImageFormat::Png, Palette::default(), &grid, MismatchPolicy::Exact)
            .unwrap_err();
        assert!(matches!(err, QrError::Validation { x: 12, y: 10, mismatches: 1 }));

        let report = validator
            .check(
                &image,
                ImageFormat::Png,
                Palette::default(),
                &grid,
                MismatchPolicy::RecoveryBudget(ErrorCorrectionLevel::Low),
            )
            .unwrap();
        assert_eq!(report.budget, 441 * 7 / 100);
        assert_eq!(report.first_mismatch(), Some((12, 10)));
    }

    #[test]
    fn test_mid_tone_modules_under_darker_overlay() {
        let grid = QrSymbolEncoder
            .encode("HELLO WORLD", ErrorCorrectionLevel::High, "UTF-8")
            .unwrap();
        let palette = Palette { dark: GREY, light: Color::WHITE };
        let mut img = paint(&grid, 6, 16, palette);
        for y in 16 + 8 * 6..16 + 13 * 6 {
            for x in 16 + 8 * 6..16 + 13 * 6 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let report = ResultValidator::default()
            .check(
                &encode_png(img),
                ImageFormat::Png,
                palette,
                &grid,
                MismatchPolicy::RecoveryBudget(ErrorCorrectionLevel::High),
            )
            .unwrap();
        assert_eq!(report.decoded_side, grid.side());
        assert!(report.mismatches.iter().all(|m| !m.expected_dark));
    }

    #[test]
    fn test_inverted_palette_round_trip() {
        let grid = symbol();
        let palette = Palette { dark: Color::WHITE, light: Color::BLACK };
        let image = encode_png(paint(&grid, 5, 10, palette));
        let decoded = SamplingDecoder.decode(&image, ImageFormat::Png, palette).unwrap();
        assert_eq!(decoded, grid);
        assert!(SamplingDecoder.decode(&image, ImageFormat::Png, Palette::default()).is_err());
    }

    #[test]
    fn test_pixels_classified_by_nearest_color() {
        let palette = Palette { dark: GREY, light: Color::WHITE };
        assert!(palette.is_dark([0, 0, 0]));
        assert!(palette.is_dark([150, 150, 150]));
        assert!(!palette.is_dark([240, 240, 240]));
        let same = Palette { dark: GREY, light: GREY };
        assert!(!same.is_dark([150, 150, 150]));
    }

    #[test]
    fn test_blank_image_is_undecodable() {
        let bytes = encode_png(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
        let err = SamplingDecoder
            .decode(&bytes, ImageFormat::Png, Palette::default())
            .unwrap_err();
        assert!(matches!(err, QrError::Decode(_)));
        let same = Palette { dark: GREY, light: GREY };
        assert!(matches!(
            SamplingDecoder.decode(&bytes, ImageFormat::Png, same),
            Err(QrError::Decode(_))
        ));
    }
}

//! Module grids and the symbol encoder seam.
//!
//! A [`ModuleGrid`] is the only thing the layout engine knows about a QR
//! symbol. Producing one from text is delegated to a [`SymbolEncoder`].

use qrcode::{EcLevel, QrCode};
use serde::Serialize;

use crate::config::ErrorCorrectionLevel;
use crate::error::{QrError, Result};

/// Immutable square matrix of dark (`true`) and light (`false`) modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleGrid {
    side: usize,
    modules: Vec<bool>,
}

impl ModuleGrid {
    /// Build a grid from row-major modules.
    pub fn new(side: usize, modules: Vec<bool>) -> Result<Self> {
        if side == 0 {
            return Err(QrError::invalid_argument("grid side must be positive"));
        }
        match side.checked_mul(side) {
            Some(count) if count == modules.len() => {}
            Some(count) => {
                return Err(QrError::InvalidArgument(format!(
                    "grid of side {} needs {} modules, got {}",
                    side,
                    count,
                    modules.len()
                )))
            }
            None => {
                return Err(QrError::InvalidArgument(format!(
                    "grid side {} is too large",
                    side
                )))
            }
        }
        Ok(Self { side, modules })
    }

    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self> {
        let side = rows.len();
        if let Some(row) = rows.iter().find(|row| row.len() != side) {
            return Err(QrError::InvalidArgument(format!(
                "grid is not square: {} rows but a row of {} modules",
                side,
                row.len()
            )));
        }
        Self::new(side, rows.concat())
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Out-of-range coordinates read as light, like the quiet zone.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.side && y < self.side && self.modules[y * self.side + x]
    }

    /// Dark module coordinates in row-major order.
    pub fn dark_modules(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let side = self.side;
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, dark)| **dark)
            .map(move |(i, _)| (i % side, i / side))
    }

    /// Horizontal runs of dark modules in row-major order as `(x, y, length)`.
    pub fn dark_runs(&self) -> Vec<(usize, usize, usize)> {
        let mut runs = vec![];
        for y in 0..self.side {
            let mut x = 0;
            while x < self.side {
                if self.is_dark(x, y) {
                    let start = x;
                    while x < self.side && self.is_dark(x, y) {
                        x += 1;
                    }
                    runs.push((start, y, x - start));
                } else {
                    x += 1;
                }
            }
        }
        runs
    }

    /// Every row-major coordinate where the two grids disagree. Cells present
    /// in only one grid count as mismatches.
    pub fn mismatches(&self, other: &ModuleGrid) -> Vec<(usize, usize)> {
        let side = self.side.max(other.side);
        let mut out = vec![];
        for y in 0..side {
            for x in 0..side {
                let inside_both = x < self.side.min(other.side) && y < self.side.min(other.side);
                if !inside_both || self.is_dark(x, y) != other.is_dark(x, y) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    pub fn first_mismatch(&self, other: &ModuleGrid) -> Option<(usize, usize)> {
        self.mismatches(other).into_iter().next()
    }

    /// Rows of `0`/`1` characters, one line per row.
    pub fn to_bit_rows(&self) -> String {
        let mut out = String::with_capacity(self.side * (self.side + 1));
        for row in self.modules.chunks(self.side) {
            out.extend(row.iter().map(|dark| if *dark { '1' } else { '0' }));
            out.push('\n');
        }
        out
    }
}

/// Turns text into a module grid.
pub trait SymbolEncoder: Send + Sync {
    fn encode(&self, text: &str, level: ErrorCorrectionLevel, encoding: &str) -> Result<ModuleGrid>;
}

/// Encoder backed by the `qrcode` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrSymbolEncoder;

impl QrSymbolEncoder {
    fn payload(text: &str, encoding: &str) -> Result<Vec<u8>> {
        match encoding.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(text.as_bytes().to_vec()),
            "iso-8859-1" | "latin1" | "latin-1" => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        QrError::Encoding(format!("character {:?} is not representable in {}", c, encoding))
                    })
                })
                .collect(),
            _ => Err(QrError::Encoding(format!("unsupported text encoding \"{}\"", encoding))),
        }
    }
}

impl SymbolEncoder for QrSymbolEncoder {
    fn encode(&self, text: &str, level: ErrorCorrectionLevel, encoding: &str) -> Result<ModuleGrid> {
        let payload = Self::payload(text, encoding)?;
        let ec = match level {
            ErrorCorrectionLevel::Low => EcLevel::L,
            ErrorCorrectionLevel::Medium => EcLevel::M,
            ErrorCorrectionLevel::Quartile => EcLevel::Q,
            ErrorCorrectionLevel::High => EcLevel::H,
        };
        let code = QrCode::with_error_correction_level(&payload, ec)
            .map_err(|e| QrError::Encoding(e.to_string()))?;
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        ModuleGrid::new(code.width(), modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_ragged_grids() {
        assert!(matches!(ModuleGrid::new(0, vec![]), Err(QrError::InvalidArgument(_))));
        assert!(matches!(ModuleGrid::new(2, vec![true; 3]), Err(QrError::InvalidArgument(_))));
        let ragged = vec![vec![true, false], vec![true]];
        assert!(matches!(ModuleGrid::from_rows(&ragged), Err(QrError::InvalidArgument(_))));
    }

    #[test]
    fn test_overflowing_side_is_rejected() {
        let err = ModuleGrid::new(usize::MAX, vec![true]).unwrap_err();
        assert!(matches!(err, QrError::InvalidArgument(m) if m.contains("too large")));
    }

    #[test]
    fn test_dark_runs_merge_neighbours() {
        let grid = ModuleGrid::from_rows(&[
            vec![true, true, false],
            vec![false, false, false],
            vec![true, false, true],
        ])
        .unwrap();
        assert_eq!(grid.dark_runs(), vec![(0, 0, 2), (0, 2, 1), (2, 2, 1)]);
        assert_eq!(grid.dark_modules().count(), 4);
        assert_eq!(grid.to_bit_rows(), "110\n000\n101\n");
    }

    #[test]
    fn test_first_mismatch_is_row_major() {
        let a = ModuleGrid::from_rows(&[vec![true, false], vec![false, true]]).unwrap();
        let b = ModuleGrid::from_rows(&[vec![true, false], vec![true, false]]).unwrap();
        assert_eq!(a.first_mismatch(&b), Some((0, 1)));
        assert_eq!(a.first_mismatch(&a.clone()), None);
    }

    #[test]
    fn test_version_one_symbol() {
        let grid = QrSymbolEncoder
            .encode("HELLO WORLD", ErrorCorrectionLevel::Low, "UTF-8")
            .unwrap();
        assert_eq!(grid.side(), 21);
        // Finder pattern corner.
        assert!(grid.is_dark(0, 0));
        assert!(grid.is_dark(20, 0));
        assert!(grid.is_dark(0, 20));
    }

    #[test]
    fn test_unknown_encoding_is_rejected() {
        let err = QrSymbolEncoder
            .encode("hi", ErrorCorrectionLevel::Low, "EBCDIC")
            .unwrap_err();
        assert!(matches!(err, QrError::Encoding(_)));
        let err = QrSymbolEncoder
            .encode("日本", ErrorCorrectionLevel::Low, "ISO-8859-1")
            .unwrap_err();
        assert!(matches!(err, QrError::Encoding(_)));
    }
}

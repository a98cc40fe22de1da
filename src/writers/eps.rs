use std::fmt::Write as _;

use super::{Capabilities, Frame, Writer, WriterKey};
use crate::config::Color;
use crate::error::Result;
use crate::layout::Rect;

/// Encapsulated PostScript writer. PostScript's origin is bottom-left, so every
/// plan rectangle is flipped against the canvas height. Logos are not drawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpsWriter;

impl Writer for EpsWriter {
    fn key(&self) -> WriterKey {
        WriterKey::EPS
    }

    fn content_type(&self) -> &str {
        "application/postscript"
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["eps"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { modules: true, logo: false, label: true }
    }

    fn render(&self, frame: &Frame<'_>) -> Result<Vec<u8>> {
        let plan = frame.plan;
        let config = frame.config;
        let height = plan.canvas_height;

        let mut out = String::new();
        out += "%!PS-Adobe-3.0 EPSF-3.0\n";
        let _ = writeln!(out, "%%BoundingBox: 0 0 {} {}", plan.canvas_width, height);
        out += "%%EndComments\n";

        let _ = writeln!(out, "{} setrgbcolor", rgb_operands(config.background_color()));
        let _ = writeln!(out, "0 0 {} {} rectfill", plan.canvas_width, height);

        let _ = writeln!(out, "{} setrgbcolor", rgb_operands(config.foreground_color()));
        for (x, y, length) in frame.grid.dark_runs() {
            let rect = plan.run_rect(x, y, length);
            let _ = writeln!(out, "{} rectfill", flipped(rect, height));
        }

        if let Some(label) = &plan.label {
            // Resolved by name; the stem of a bundled font is its PostScript name.
            let font = config
                .label_font_path()
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-', ""))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Helvetica".to_string());
            let _ = writeln!(out, "/{} findfont {} scalefont setfont", font, label.font_size);
            let _ = writeln!(out, "{} {} moveto", label.bounds.x, height.saturating_sub(label.baseline));
            let _ = writeln!(out, "({}) show", escape_ps(&label.text));
        }

        out += "%%EOF\n";
        Ok(out.into_bytes())
    }
}

fn rgb_operands(color: Color) -> String {
    let [r, g, b] = color.channels().map(|c| f64::from(c) / 255.0);
    format!("{:.4} {:.4} {:.4}", r, g, b)
}

fn flipped(rect: Rect, canvas_height: u32) -> String {
    format!(
        "{} {} {} {}",
        rect.x,
        canvas_height.saturating_sub(rect.bottom()),
        rect.width,
        rect.height
    )
}

fn escape_ps(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(byte as char);
            }
            0x20..=0x7e => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{:03o}", byte);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::writers::test_support::{plan, BlockFont};

    #[test]
    fn test_rectangles_are_flipped() {
        let mut config = Configuration::new("x");
        config.set_size(20).unwrap();
        let grid = crate::grid::ModuleGrid::from_rows(&[vec![true, false], vec![false, false]]).unwrap();
        let plan = plan(&config, &grid);
        let frame = Frame { config: &config, grid: &grid, plan: &plan, fonts: &BlockFont };
        let eps = String::from_utf8(EpsWriter.render(&frame).unwrap()).unwrap();

        assert!(eps.starts_with("%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 0 0 20 20\n"));
        assert!(eps.contains("1.0000 1.0000 1.0000 setrgbcolor\n0 0 20 20 rectfill\n"));
        assert!(eps.contains("0 10 10 10 rectfill\n"));
        assert!(eps.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_postscript_string_escaping() {
        assert_eq!(escape_ps("a(b)\\"), "a\\(b\\)\\\\");
        assert_eq!(escape_ps("é"), "\\303\\251");
    }

    #[test]
    fn test_no_logo_capability() {
        let capabilities = EpsWriter.capabilities();
        assert!(capabilities.modules && capabilities.label);
        assert!(!capabilities.logo);
    }
}

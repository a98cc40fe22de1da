use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::{Frame, Writer, WriterKey};
use crate::error::Result;

/// Vector writer using the plan's integer pixel geometry as SVG user units.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgWriter;

impl Writer for SvgWriter {
    fn key(&self) -> WriterKey {
        WriterKey::SVG
    }

    fn content_type(&self) -> &str {
        "image/svg+xml"
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["svg"]
    }

    fn render(&self, frame: &Frame<'_>) -> Result<Vec<u8>> {
        let plan = frame.plan;
        let config = frame.config;
        let (width, height) = (plan.canvas_width, plan.canvas_height);
        let foreground = config.foreground_color().to_hex();

        let mut out = String::new();
        out += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
        let _ = writeln!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
             version=\"1.1\" width=\"{0}\" height=\"{1}\" viewBox=\"0 0 {0} {1}\">",
            width, height
        );
        let _ = writeln!(
            out,
            "\t<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
            width,
            height,
            config.background_color().to_hex()
        );

        let runs = frame.grid.dark_runs();
        if !runs.is_empty() {
            out += "\t<path d=\"";
            for (i, (x, y, length)) in runs.into_iter().enumerate() {
                let rect = plan.run_rect(x, y, length);
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "M{},{}h{}v{}h-{}z", rect.x, rect.y, rect.width, rect.height, rect.width);
            }
            let _ = writeln!(out, "\" fill=\"{}\"/>", foreground);
        }

        if let (Some(rect), Some(path)) = (plan.logo, config.logo_path()) {
            let data = STANDARD.encode(fs::read(path)?);
            let _ = writeln!(
                out,
                "\t<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" \
                 xlink:href=\"data:{};base64,{}\"/>",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                image_mime(path),
                data
            );
        }

        if let Some(label) = &plan.label {
            let font_path = config.label_font_path();
            let family = font_path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_', ""))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "label".to_string());
            // The label face travels with the document.
            let _ = writeln!(
                out,
                "\t<defs><style>@font-face {{ font-family: \"{}\"; src: url(data:{};base64,{}); }}</style></defs>",
                family,
                font_mime(font_path),
                STANDARD.encode(fs::read(font_path)?)
            );
            let _ = writeln!(
                out,
                "\t<text x=\"{}\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                label.bounds.x,
                label.baseline,
                family,
                label.font_size,
                foreground,
                escape_xml(&label.text)
            );
        }

        out += "</svg>\n";
        Ok(out.into_bytes())
    }
}

pub(crate) fn image_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn font_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("otf") => "font/otf",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "font/ttf",
    }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

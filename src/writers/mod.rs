//! Writers - Format Backends Over One Render Plan
//!
//! A writer turns a [`Frame`] into bytes. Writers never compute geometry;
//! they read it from the plan so every format stays superimposable.

use serde::Serialize;
use std::fmt;

use crate::config::Configuration;
use crate::error::Result;
use crate::fonts::FontProvider;
use crate::grid::ModuleGrid;
use crate::layout::RenderPlan;

mod binary;
mod data_uri;
mod eps;
mod png;
mod svg;

pub use binary::BinaryWriter;
pub use data_uri::DataUriWriter;
pub use eps::EpsWriter;
pub use png::PngWriter;
pub use svg::SvgWriter;

/// Stable writer identity used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WriterKey(&'static str);

impl WriterKey {
    pub const BINARY: WriterKey = WriterKey("binary");
    pub const DATA_URI: WriterKey = WriterKey("data-uri");
    pub const EPS: WriterKey = WriterKey("eps");
    pub const PNG: WriterKey = WriterKey("png");
    pub const SVG: WriterKey = WriterKey("svg");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for WriterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Which parts of the plan a writer can actually draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub modules: bool,
    pub logo: bool,
    pub label: bool,
}

impl Capabilities {
    pub const FULL: Capabilities = Capabilities { modules: true, logo: true, label: true };
    pub const OPAQUE: Capabilities = Capabilities { modules: false, logo: false, label: false };
}

/// Everything a writer reads during one render call.
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    pub config: &'a Configuration,
    pub grid: &'a ModuleGrid,
    pub plan: &'a RenderPlan,
    pub fonts: &'a dyn FontProvider,
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("config", self.config)
            .field("grid_side", &self.grid.side())
            .field("plan", self.plan)
            .finish_non_exhaustive()
    }
}

pub trait Writer: Send + Sync {
    fn key(&self) -> WriterKey;

    fn content_type(&self) -> &str;

    /// Lowercase file extensions this writer answers to, without the dot.
    fn supported_extensions(&self) -> &[&'static str];

    fn capabilities(&self) -> Capabilities {
        Capabilities::FULL
    }

    fn render(&self, frame: &Frame<'_>) -> Result<Vec<u8>>;
}

/// Built-in writers in registration order.
pub fn builtin_writers() -> Vec<Box<dyn Writer>> {
    vec![
        Box::new(BinaryWriter),
        Box::new(DataUriWriter::default()),
        Box::new(EpsWriter),
        Box::new(PngWriter),
        Box::new(SvgWriter),
    ]
}

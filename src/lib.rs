//! QR Canvas Core - Deterministic QR Symbol Rendering
//!
//! # Guarantees
//! 1. One Plan, Every Format: raster and vector output share the same geometry
//! 2. Deterministic Output: identical inputs give identical bytes
//! 3. Eager Validation: bad sizes and paths fail at configuration time
//! 4. Logos Respect Error Correction: overlays are clamped, never fatal
//! 5. Explicit Writer Selection Beats Inference

pub mod config;
pub mod error;
pub mod fonts;
pub mod grid;
pub mod hashing;
pub mod layout;
pub mod pipeline;
pub mod registry;
pub mod validation;
pub mod writers;

pub use config::{
    bundled_label_font_path, Color, Configuration, ConfigurationSpec, ErrorCorrectionLevel,
    LabelAlignment, LabelOptions, Margin, MarginPatch,
};
pub use error::{QrError, Result};
pub use fonts::{FontProvider, GlyphMask, TextMetrics, TrueTypeFonts};
pub use grid::{ModuleGrid, QrSymbolEncoder, SymbolEncoder};
pub use hashing::{canonical_json, compute_job_hash, sha256_hex};
pub use layout::{LabelPlacement, Rect, RenderPlan};
pub use pipeline::RenderPipeline;
pub use registry::WriterRegistry;
pub use validation::{
    MismatchPolicy, Palette, ResultValidator, SamplingDecoder, SymbolDecoder, ValidationReport,
};
pub use writers::{
    BinaryWriter, Capabilities, DataUriWriter, EpsWriter, Frame, PngWriter, SvgWriter, Writer, WriterKey,
};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

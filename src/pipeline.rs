//! Render Pipeline - Single Entry Point
//!
//! Owns the writer registry and the encoder, font and decoder collaborators.
//! Configuration is borrowed per call and never mutated, so one pipeline can
//! serve concurrent renders.

use image::ImageFormat;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::config::Configuration;
use crate::error::Result;
use crate::fonts::{FontProvider, TrueTypeFonts};
use crate::grid::{ModuleGrid, QrSymbolEncoder, SymbolEncoder};
use crate::layout::RenderPlan;
use crate::registry::WriterRegistry;
use crate::validation::{MismatchPolicy, Palette, ResultValidator, SymbolDecoder, ValidationReport};
use crate::writers::{Frame, PngWriter, Writer, WriterKey};

pub struct RenderPipeline {
    registry: WriterRegistry,
    encoder: Box<dyn SymbolEncoder>,
    fonts: Box<dyn FontProvider>,
    validator: ResultValidator,
}

impl RenderPipeline {
    /// Pipeline with the built-in writers and default collaborators.
    pub fn new() -> Self {
        Self::with_registry(WriterRegistry::with_builtin_writers())
    }

    pub fn with_registry(registry: WriterRegistry) -> Self {
        Self {
            registry,
            encoder: Box::new(QrSymbolEncoder),
            fonts: Box::new(TrueTypeFonts),
            validator: ResultValidator::default(),
        }
    }

    pub fn with_encoder(mut self, encoder: Box<dyn SymbolEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_fonts(mut self, fonts: Box<dyn FontProvider>) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_decoder(mut self, decoder: Box<dyn SymbolDecoder>) -> Self {
        self.validator = ResultValidator::new(decoder);
        self
    }

    pub fn registry(&self) -> &WriterRegistry {
        &self.registry
    }

    /// First registration of a key wins; returns whether `writer` was kept.
    pub fn register_writer(&mut self, writer: Box<dyn Writer>) -> bool {
        self.registry.register(writer)
    }

    pub fn content_type(&self, key: WriterKey) -> Result<&str> {
        Ok(self.registry.get(key)?.content_type())
    }

    pub fn writer_by_path(&self, path: &Path) -> Result<&dyn Writer> {
        self.registry.by_path(path)
    }

    pub fn writer_by_extension(&self, extension: &str) -> Result<&dyn Writer> {
        self.registry.by_extension(extension)
    }

    pub fn encode(&self, config: &Configuration) -> Result<ModuleGrid> {
        self.encoder.encode(
            config.text(),
            config.error_correction_level(),
            config.encoding(),
        )
    }

    pub fn plan(&self, config: &Configuration, grid: &ModuleGrid) -> Result<RenderPlan> {
        RenderPlan::compute(config, grid, self.fonts.as_ref())
    }

    /// Encode the configured text and render it with the writer under `key`.
    #[instrument(skip(self, config), fields(writer = %key))]
    pub fn write_string(&self, config: &Configuration, key: WriterKey) -> Result<Vec<u8>> {
        let writer = self.registry.get(key)?;
        let grid = self.encode(config)?;
        self.render_with(writer, config, &grid)
    }

    /// Render an already-encoded grid with the writer under `key`.
    #[instrument(skip(self, config, grid), fields(writer = %key, side = grid.side()))]
    pub fn render_grid(&self, config: &Configuration, grid: &ModuleGrid, key: WriterKey) -> Result<Vec<u8>> {
        let writer = self.registry.get(key)?;
        self.render_with(writer, config, grid)
    }

    /// Render and write to `path`. An explicit `key` overrides extension
    /// sniffing. Nothing is written unless rendering and validation succeed.
    #[instrument(skip(self, config, path), fields(path = %path.display()))]
    pub fn write_file(&self, config: &Configuration, path: &Path, key: Option<WriterKey>) -> Result<Vec<u8>> {
        let writer = match key {
            Some(key) => self.registry.get(key)?,
            None => self.registry.by_path(path)?,
        };
        let grid = self.encode(config)?;
        let bytes = self.render_with(writer, config, &grid)?;
        fs::write(path, &bytes)?;
        info!(writer = %writer.key(), bytes = bytes.len(), "artifact written");
        Ok(bytes)
    }

    fn render_with(&self, writer: &dyn Writer, config: &Configuration, grid: &ModuleGrid) -> Result<Vec<u8>> {
        let plan = self.plan(config, grid)?;
        warn_unsupported(writer, &plan);

        let frame = Frame {
            config,
            grid,
            plan: &plan,
            fonts: self.fonts.as_ref(),
        };
        let bytes = writer.render(&frame)?;
        debug!(writer = %writer.key(), bytes = bytes.len(), "rendered");

        if config.validate_result() {
            self.validate_frame(&frame, writer, &bytes)?;
        }
        Ok(bytes)
    }

    /// Validation always reads a PNG of the same plan; PNG output is reused.
    fn validate_frame(&self, frame: &Frame<'_>, writer: &dyn Writer, bytes: &[u8]) -> Result<ValidationReport> {
        let policy = if frame.plan.logo.is_some() {
            MismatchPolicy::RecoveryBudget(frame.config.error_correction_level())
        } else {
            MismatchPolicy::Exact
        };
        let palette = Palette::of(frame.config);
        if writer.key() == WriterKey::PNG {
            return self.validator.check(bytes, ImageFormat::Png, palette, frame.grid, policy);
        }
        let raster = PngWriter.render(frame)?;
        self.validator.check(&raster, ImageFormat::Png, palette, frame.grid, policy)
    }
}

fn warn_unsupported(writer: &dyn Writer, plan: &RenderPlan) {
    let capabilities = writer.capabilities();
    if !capabilities.modules {
        debug!(writer = %writer.key(), "writer emits an opaque payload; plan geometry unused");
    }
    if plan.logo.is_some() && !capabilities.logo {
        warn!(writer = %writer.key(), "writer cannot draw logos; logo omitted");
    }
    if plan.label.is_some() && !capabilities.label {
        warn!(writer = %writer.key(), "writer cannot draw labels; label omitted");
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

//! Writer Registry - Keyed, Ordered, First Registration Wins

use std::path::Path;
use tracing::debug;

use crate::error::{QrError, Result};
use crate::writers::{builtin_writers, Writer, WriterKey};

/// Writers in registration order. Extension lookups scan in that order.
pub struct WriterRegistry {
    writers: Vec<Box<dyn Writer>>,
}

impl WriterRegistry {
    pub fn new() -> Self {
        Self { writers: Vec::new() }
    }

    /// Registry holding the binary, data URI, EPS, PNG and SVG writers.
    pub fn with_builtin_writers() -> Self {
        let mut registry = Self::new();
        for writer in builtin_writers() {
            registry.register(writer);
        }
        registry
    }

    /// Returns `false` and drops `writer` when its key is already taken.
    pub fn register(&mut self, writer: Box<dyn Writer>) -> bool {
        let key = writer.key();
        if self.contains(key) {
            debug!(writer = %key, "writer already registered; keeping the first");
            return false;
        }
        self.writers.push(writer);
        true
    }

    pub fn contains(&self, key: WriterKey) -> bool {
        self.writers.iter().any(|w| w.key() == key)
    }

    pub fn get(&self, key: WriterKey) -> Result<&dyn Writer> {
        self.writers
            .iter()
            .find(|w| w.key() == key)
            .map(Box::as_ref)
            .ok_or_else(|| QrError::MissingWriter(format!("no renderer for key {}", key)))
    }

    /// Resolve a key from its string form, e.g. a CLI argument.
    pub fn key_named(&self, name: &str) -> Result<WriterKey> {
        self.writers
            .iter()
            .map(|w| w.key())
            .find(|key| key.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| QrError::MissingWriter(format!("no renderer for key {}", name)))
    }

    pub fn by_extension(&self, extension: &str) -> Result<&dyn Writer> {
        self.writers
            .iter()
            .find(|w| {
                w.supported_extensions()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(extension))
            })
            .map(Box::as_ref)
            .ok_or_else(|| QrError::MissingWriter(format!("no renderer for extension {}", extension)))
    }

    pub fn by_path(&self, path: &Path) -> Result<&dyn Writer> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.by_extension(extension)
    }

    pub fn entries(&self) -> impl Iterator<Item = &dyn Writer> {
        self.writers.iter().map(Box::as_ref)
    }
}

impl Default for WriterRegistry {
    fn default() -> Self {
        Self::with_builtin_writers()
    }
}

impl std::fmt::Debug for WriterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.writers.iter().map(|w| w.key())).finish()
    }
}

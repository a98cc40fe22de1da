use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{Capabilities, Frame, PngWriter, Writer, WriterKey};
use crate::error::Result;

/// Wraps another writer's output in a `data:` URI. Geometry comes entirely
/// from the inner writer.
pub struct DataUriWriter {
    inner: Box<dyn Writer>,
}

impl DataUriWriter {
    pub fn new(inner: Box<dyn Writer>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &dyn Writer {
        self.inner.as_ref()
    }
}

impl Default for DataUriWriter {
    fn default() -> Self {
        Self::new(Box::new(PngWriter))
    }
}

impl std::fmt::Debug for DataUriWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataUriWriter")
            .field("inner", &self.inner.key())
            .finish()
    }
}

impl Writer for DataUriWriter {
    fn key(&self) -> WriterKey {
        WriterKey::DATA_URI
    }

    fn content_type(&self) -> &str {
        "text/plain"
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[]
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn render(&self, frame: &Frame<'_>) -> Result<Vec<u8>> {
        let payload = self.inner.render(frame)?;
        let uri = format!("data:{};base64,{}", self.inner.content_type(), STANDARD.encode(payload));
        Ok(uri.into_bytes())
    }
}

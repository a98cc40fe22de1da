//! Error taxonomy shared by every stage of the render pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QrError>;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Missing writer: {0}")]
    MissingWriter(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The rendered image no longer reproduces the source grid.
    #[error("Validation failed at module ({x}, {y}): {mismatches} mismatched module(s)")]
    Validation {
        x: usize,
        y: usize,
        mismatches: usize,
    },

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QrError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

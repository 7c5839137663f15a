//! Error types for deck assembly and export.
//!
//! Missing categories, zero baselines and empty dimensions are resolved by
//! policy inside the pipeline and never surface here.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or exporting a comparison deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The caller supplied input the pipeline cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Options could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The mounted slide has no capture target on the surface.
    #[error("Capture target missing for slide '{key}'")]
    RasterizationTargetMissing { key: String },

    /// The surface never signalled that the mounted slide was committed.
    #[error("Render commit timed out for slide '{key}'")]
    RenderCommitTimeout { key: String },

    /// The capture surface failed to mount or rasterize a slide.
    #[error("Capture surface error: {0}")]
    Surface(String),

    /// Image encoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The document compositor could not assemble the output.
    #[error("Document assembly failed: {0}")]
    DocumentAssembly(String),

    /// ZIP archive error (for the PPTX package).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML writing error (for the PPTX package).
    #[error("XML error: {0}")]
    XmlError(String),
}

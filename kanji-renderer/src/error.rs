//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while drawing or exporting.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Backing buffer could not be allocated.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Guide SVG could not be parsed or rasterized.
    #[error("Guide rendering failed: {0}")]
    Guide(String),

    /// Image encoding failed.
    #[error("Export failed: {0}")]
    Export(String),
}

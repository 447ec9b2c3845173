//! Error types for core operations.

use thiserror::Error;

/// Result type for core operations.
pub type KanjiResult<T> = Result<T, KanjiError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum KanjiError {
    /// Grade outside the elementary curriculum (1-6).
    #[error("Unknown grade: {0}")]
    UnknownGrade(u8),

    /// Input was not exactly one character.
    #[error("Expected a single character, got {0:?}")]
    InvalidCharacter(String),

    /// Stroke document could not be parsed.
    #[error("Malformed stroke document: {0}")]
    StrokeDocument(String),

    /// A stroke path carried invalid path data.
    #[error("Invalid path data in stroke {index}: {message}")]
    InvalidPath {
        /// Zero-based stroke index.
        index: usize,
        /// Parser message.
        message: String,
    },

    /// Session operation not valid in the current state.
    #[error("Invalid session operation: {0}")]
    InvalidOperation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

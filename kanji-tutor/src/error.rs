//! Tutor error types.

use kanji_core::KanjiError;
use kanji_renderer::RenderError;
use thiserror::Error;

/// Result type for tutor operations.
pub type TutorResult<T> = Result<T, TutorError>;

/// Errors from the tutor's network boundaries and flow controllers.
#[derive(Debug, Error)]
pub enum TutorError {
    /// A required setting is missing.
    #[error("tutor not configured: {0}")]
    NotConfigured(&'static str),

    /// A configured URL is malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP layer failed (connection, timeout, body read).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Response status.
        status: reqwest::StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },

    /// JSON decoding failed.
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Response decoded but did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Submission attempted with nothing drawn.
    #[error("nothing has been drawn")]
    EmptyCanvas,

    /// Test answer submitted before its question arrived.
    #[error("quiz question not ready")]
    QuizNotReady,

    /// Operation not valid in the controller's current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Drawing surface failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Session state failure.
    #[error(transparent)]
    Core(#[from] KanjiError),
}

impl TutorError {
    /// True for errors the user can fix by acting (drawing, waiting).
    #[must_use]
    pub fn is_user_actionable(&self) -> bool {
        matches!(self, Self::EmptyCanvas | Self::QuizNotReady)
    }
}

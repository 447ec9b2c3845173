//! The AI boundary.
//!
//! Everything the tutor asks of the generative model goes through
//! [`TutorModel`]. [`crate::GeminiModel`] is the production implementation;
//! tests substitute their own.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use kanji_core::QuizQuestion;
use kanji_renderer::ExportedImage;
use serde::{Deserialize, Serialize};

use crate::error::TutorResult;

/// Ordered correction text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = TutorResult<String>> + Send>>;

/// Structured verification answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Whether the drawing is an acceptable rendition of the target.
    pub is_correct: bool,
}

/// Operations the tutor needs from a multimodal model.
///
/// Implementations return raw results and errors; degrade semantics
/// (apologies, placeholders, `false`) live in [`crate::CorrectionClient`].
#[async_trait]
pub trait TutorModel: Send + Sync {
    /// Identify the character in the image. May return extra text.
    async fn recognize(&self, image: &ExportedImage) -> TutorResult<String>;

    /// Judge whether the image is a correct rendition of `target`.
    async fn verify(&self, image: &ExportedImage, target: char) -> TutorResult<Verdict>;

    /// Stream child-friendly feedback on how the drawing differs from `target`.
    async fn stream_correction(
        &self,
        image: &ExportedImage,
        target: char,
    ) -> TutorResult<FragmentStream>;

    /// Example words using `character`, annotated with furigana.
    async fn generate_examples(&self, character: char) -> TutorResult<Vec<String>>;

    /// A fill-in-the-blank sentence whose answer is `character`.
    async fn generate_quiz(&self, character: char) -> TutorResult<QuizQuestion>;
}

//! # Kanji Pad Tutor
//!
//! The asynchronous half of Kanji Pad: stroke guides fetched from KanjiVG,
//! handwriting verification and streamed correction from a multimodal model,
//! and the practice and test flows that tie them to a [`DrawingSurface`].
//!
//! ## Data flow
//!
//! ```text
//!   InputEvent ──▶ PracticeController / TestController ──▶ DrawingSurface
//!                        │          ▲
//!          spawn (tagged)│          │ Internal messages
//!                        ▼          │
//!          StrokeSource ─┤    CorrectionClient ──▶ TutorModel (Gemini)
//!                        │
//!                next_update() ──▶ host view
//! ```
//!
//! Every remote failure degrades: no guide, an incorrect verdict, an apology
//! in place of correction text, or a placeholder quiz.
//!
//! [`DrawingSurface`]: kanji_renderer::DrawingSurface

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod correction;
pub mod error;
pub mod gemini;
pub mod guide;
pub mod model;
pub mod practice;
pub mod prompts;
pub mod quiz;
pub mod schedule;

pub use config::TutorConfig;
pub use correction::{placeholder_quiz, CancelHandle, CorrectionClient, CorrectionStream, APOLOGY};
pub use error::{TutorError, TutorResult};
pub use gemini::GeminiModel;
pub use guide::{KanjiVgSource, NoGuides, StrokeSource};
pub use model::{FragmentStream, TutorModel, Verdict};
pub use practice::{PracticeController, PracticeOptions, PracticePhase, PracticeUpdate, PRAISE};
pub use quiz::{TestController, TestPhase, TestUpdate};
pub use schedule::{Generation, ScheduledTask};

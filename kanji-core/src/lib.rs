//! # Kanji Pad Core
//!
//! Pure data and logic for the kanji handwriting pad. Nothing in this crate
//! performs I/O; the renderer and tutor crates build on it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 kanji-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Curriculum      │  Stroke Geometry         │
//! │  - Grade tables  │  - KanjiVG parsing       │
//! │  - Furigana      │  - Lookup keys           │
//! ├─────────────────────────────────────────────┤
//! │  Input Events    │  Session State           │
//! │  - Mouse/touch   │  - Practice navigation   │
//! │  - Coordinates   │  - Test scoring          │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod curriculum;
pub mod error;
pub mod event;
pub mod geometry;
pub mod record;
pub mod state;
pub mod stroke;

pub use curriculum::{characters_for_grade, find_character};
pub use error::{KanjiError, KanjiResult};
pub use event::{InputEvent, PointerKind, PointerPhase, TouchEvent, TouchPhase, TouchPoint};
pub use geometry::{ElementRect, LogicalPoint, LogicalSize, SurfaceMetrics};
pub use record::{CharacterRecord, ExampleWord, Grade};
pub use state::{
    Feedback, FeedbackStatus, PracticeSessionState, QuizQuestion, SessionId, TestSessionState,
};
pub use stroke::{stroke_key, Affine, StrokeGeometry, StrokePath};

/// Kanji core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

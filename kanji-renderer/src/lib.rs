//! # Kanji Pad Renderer
//!
//! The drawing surface: a non-interactive guide layer under a transparent
//! ink layer, both backed by tiny-skia pixmaps at physical resolution.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              DrawingSurface                 │
//! ├─────────────────────────────────────────────┤
//! │  Ink layer        (strokes, input)          │
//! ├─────────────────────────────────────────────┤
//! │  Guide layer      (grid + strokes / glyph)  │
//! └─────────────────────────────────────────────┘
//!            │ export: ink over white
//!            ▼
//!        PNG / JPEG
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod guide;
pub mod ink;
pub mod surface;

pub use error::{RenderError, RenderResult};
pub use export::{ExportedImage, ImageFormat};
pub use guide::{GuideMode, GuideRenderer, PALETTE};
pub use ink::{InkLayer, InkStroke, InkStyle};
pub use surface::{DrawingSurface, InputResponse, SurfaceSignal};

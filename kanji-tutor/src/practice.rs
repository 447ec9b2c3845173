//! Practice flow.
//!
//! ```text
//!            stroke start                stroke end
//!   Idle ───────────────▶ Drawing ───────────────────▶ Monitoring
//!                           ▲  ▲                          │   │
//!                           │  └──── stroke start ────────┘   │ debounce
//!                           │                                 ▼
//!                           │  stroke start           Checking
//!                           ├─────────────────────────────┤   │ verdict / text
//!                           │                                 ▼
//!                           └──────────────────── ShowingCorrection
//! ```
//!
//! Navigation and `clear` return to `Idle` from any phase. Background work
//! reports through an internal channel, tagged with a generation so that
//! results of abandoned work are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use kanji_core::{
    CharacterRecord, ElementRect, InputEvent, LogicalSize, PracticeSessionState, StrokeGeometry,
};
use kanji_renderer::{DrawingSurface, GuideMode, ImageFormat, InputResponse, SurfaceSignal};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::TutorConfig;
use crate::correction::CorrectionClient;
use crate::error::{TutorError, TutorResult};
use crate::guide::StrokeSource;
use crate::schedule::{Generation, ScheduledTask};

/// Shown when a drawing passes verification.
pub const PRAISE: &str = "よく かけたね！ばっちり！";

/// Where the practice flow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticePhase {
    /// Nothing drawn.
    Idle,
    /// A stroke is in progress.
    Drawing,
    /// Pen is up; waiting for inactivity before checking.
    Monitoring,
    /// Verification or correction request in flight.
    Checking,
    /// Verdict or correction text is being shown.
    ShowingCorrection,
}

/// Something the host should reflect in its view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PracticeUpdate {
    /// Stroke geometry arrived and the guide was redrawn.
    GuideApplied {
        /// Character the guide shows.
        character: char,
        /// What was drawn.
        mode: GuideMode,
    },
    /// A check was sent.
    CheckStarted {
        /// Character being checked.
        character: char,
    },
    /// Verification finished.
    Verdict {
        /// Character that was checked.
        character: char,
        /// Outcome.
        correct: bool,
    },
    /// More correction text.
    CorrectionFragment {
        /// The new fragment.
        text: String,
    },
    /// Correction text is complete.
    CorrectionFinished,
    /// A debounced resize was applied.
    Resized {
        /// Whether the buffers were reallocated.
        reallocated: bool,
    },
}

/// Timing and export settings for the practice flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PracticeOptions {
    /// Inactivity before an automatic check.
    pub debounce: Duration,
    /// Settle time for resize notifications.
    pub resize_debounce: Duration,
    /// Encoding of images sent for checking.
    pub export_format: ImageFormat,
}

impl Default for PracticeOptions {
    fn default() -> Self {
        Self::from(&TutorConfig::default())
    }
}

impl From<&TutorConfig> for PracticeOptions {
    fn from(config: &TutorConfig) -> Self {
        Self {
            debounce: config.debounce,
            resize_debounce: config.resize_debounce,
            export_format: ImageFormat::Png,
        }
    }
}

enum Internal {
    Guide {
        character: char,
        geometry: Option<StrokeGeometry>,
    },
    DebounceElapsed {
        generation: u64,
    },
    CheckStarted {
        generation: u64,
        character: char,
    },
    Verdict {
        generation: u64,
        character: char,
        correct: bool,
    },
    Fragment {
        generation: u64,
        text: String,
    },
    CorrectionDone {
        generation: u64,
    },
    Resize {
        size: LogicalSize,
        device_pixel_ratio: f32,
    },
}

/// Drives a practice session: drawing, guides, automatic checking.
///
/// Construct and use within a Tokio runtime. Feed input with
/// [`PracticeController::handle_input`] and poll
/// [`PracticeController::next_update`] for results of background work.
pub struct PracticeController {
    surface: DrawingSurface,
    session: PracticeSessionState,
    phase: PracticePhase,
    client: CorrectionClient,
    guides: Arc<dyn StrokeSource>,
    guide_cache: HashMap<char, Option<StrokeGeometry>>,
    options: PracticeOptions,
    generation: Generation,
    debounce_task: ScheduledTask,
    check_task: ScheduledTask,
    guide_task: ScheduledTask,
    resize_task: ScheduledTask,
    tx: mpsc::UnboundedSender<Internal>,
    rx: mpsc::UnboundedReceiver<Internal>,
}

impl PracticeController {
    /// Start practising `session` on `surface`. Begins loading the first
    /// character's guide.
    #[must_use]
    pub fn new(
        surface: DrawingSurface,
        session: PracticeSessionState,
        client: CorrectionClient,
        guides: Arc<dyn StrokeSource>,
        options: PracticeOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut controller = Self {
            surface,
            session,
            phase: PracticePhase::Idle,
            client,
            guides,
            guide_cache: HashMap::new(),
            options,
            generation: Generation::default(),
            debounce_task: ScheduledTask::new(),
            check_task: ScheduledTask::new(),
            guide_task: ScheduledTask::new(),
            resize_task: ScheduledTask::new(),
            tx,
            rx,
        };
        controller.surface.clear();
        controller.load_guide();
        controller
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PracticePhase {
        self.phase
    }

    /// Session state (character list, cursor, correction text).
    #[must_use]
    pub fn session(&self) -> &PracticeSessionState {
        &self.session
    }

    /// The character being practised.
    #[must_use]
    pub fn current(&self) -> CharacterRecord {
        *self.session.current()
    }

    /// The drawing surface.
    #[must_use]
    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    /// Update the surface's on-screen rectangle.
    pub fn set_element_rect(&mut self, rect: ElementRect) {
        self.surface.set_element_rect(rect);
    }

    /// Feed an input event to the surface and react to its signals.
    pub fn handle_input(&mut self, event: &InputEvent) -> InputResponse {
        let response = self.surface.handle_input(event);
        for signal in &response.signals {
            match signal {
                SurfaceSignal::StrokeStarted => self.on_stroke_started(),
                SurfaceSignal::StrokeEnded => self.on_stroke_ended(),
                SurfaceSignal::DrawingChanged => {}
            }
        }
        response
    }

    /// Check now, bypassing the debounce.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::EmptyCanvas`] without sending anything if nothing
    /// has been drawn, [`TutorError::InvalidState`] while a stroke is still
    /// in progress, or a render error if the drawing cannot be exported.
    pub fn submit(&mut self) -> TutorResult<()> {
        if self.surface.is_empty() {
            return Err(TutorError::EmptyCanvas);
        }
        if self.surface.is_drawing() {
            return Err(TutorError::InvalidState("stroke in progress".to_string()));
        }
        self.debounce_task.cancel();
        self.start_check()
    }

    /// Erase the drawing and cancel pending work.
    pub fn clear(&mut self) {
        self.reset();
    }

    /// Move to the next character (wrapping).
    pub fn next_character(&mut self) -> CharacterRecord {
        self.session.advance();
        self.reset();
        self.load_guide();
        self.current()
    }

    /// Move to the previous character (wrapping).
    pub fn previous_character(&mut self) -> CharacterRecord {
        self.session.retreat();
        self.reset();
        self.load_guide();
        self.current()
    }

    /// Report a container size change. Applied after the resize settles.
    pub fn observe_resize(&mut self, size: LogicalSize, device_pixel_ratio: f32) {
        let tx = self.tx.clone();
        self.resize_task
            .schedule(self.options.resize_debounce, async move {
                let _ = tx.send(Internal::Resize {
                    size,
                    device_pixel_ratio,
                });
            });
    }

    /// Wait for the next result of background work.
    ///
    /// Stale results are consumed silently. Returns `None` only if the
    /// internal channel closed, which cannot happen while `self` is alive.
    pub async fn next_update(&mut self) -> Option<PracticeUpdate> {
        while let Some(message) = self.rx.recv().await {
            if let Some(update) = self.apply(message) {
                return Some(update);
            }
        }
        None
    }

    fn apply(&mut self, message: Internal) -> Option<PracticeUpdate> {
        match message {
            Internal::Guide {
                character,
                geometry,
            } => {
                self.guide_cache.insert(character, geometry.clone());
                if self.session.current().character != character {
                    debug!(%character, "Guide arrived for a character no longer shown");
                    return None;
                }
                let mode = self.surface.render_guide(character, geometry);
                Some(PracticeUpdate::GuideApplied { character, mode })
            }
            Internal::DebounceElapsed { generation } => {
                if !self.generation.is_current(generation) || self.phase != PracticePhase::Monitoring
                {
                    return None;
                }
                if let Err(e) = self.start_check() {
                    warn!(error = %e, "Automatic check failed to start");
                    self.set_phase(PracticePhase::Idle);
                }
                None
            }
            Internal::CheckStarted {
                generation,
                character,
            } => self
                .generation
                .is_current(generation)
                .then_some(PracticeUpdate::CheckStarted { character }),
            Internal::Verdict {
                generation,
                character,
                correct,
            } => {
                if !self.generation.is_current(generation) {
                    return None;
                }
                self.session.begin_correction();
                self.session.set_verdict(correct);
                if correct {
                    self.session.append_correction(PRAISE);
                    self.set_phase(PracticePhase::ShowingCorrection);
                }
                Some(PracticeUpdate::Verdict { character, correct })
            }
            Internal::Fragment { generation, text } => {
                if !self.generation.is_current(generation) {
                    return None;
                }
                self.session.append_correction(&text);
                self.set_phase(PracticePhase::ShowingCorrection);
                Some(PracticeUpdate::CorrectionFragment { text })
            }
            Internal::CorrectionDone { generation } => {
                if !self.generation.is_current(generation) {
                    return None;
                }
                self.set_phase(PracticePhase::ShowingCorrection);
                Some(PracticeUpdate::CorrectionFinished)
            }
            Internal::Resize {
                size,
                device_pixel_ratio,
            } => match self.surface.resize(size, device_pixel_ratio) {
                Ok(reallocated) => Some(PracticeUpdate::Resized { reallocated }),
                Err(e) => {
                    warn!(error = %e, "Resize failed");
                    None
                }
            },
        }
    }

    fn on_stroke_started(&mut self) {
        self.debounce_task.cancel();
        self.check_task.cancel();
        self.generation.advance();
        self.session.dismiss_correction();
        self.session.has_ink = true;
        self.set_phase(PracticePhase::Drawing);
    }

    fn on_stroke_ended(&mut self) {
        // A check already owns this drawing.
        if self.phase == PracticePhase::Checking {
            return;
        }
        self.set_phase(PracticePhase::Monitoring);
        let generation = self.generation.current();
        let tx = self.tx.clone();
        self.debounce_task.schedule(self.options.debounce, async move {
            let _ = tx.send(Internal::DebounceElapsed { generation });
        });
    }

    fn start_check(&mut self) -> TutorResult<()> {
        let image = self.surface.export_image(self.options.export_format)?;
        self.check_task.cancel();
        let generation = self.generation.advance();
        let character = self.session.current().character;
        self.session.dismiss_correction();
        self.set_phase(PracticePhase::Checking);

        let client = self.client.clone();
        let tx = self.tx.clone();
        self.check_task.spawn(async move {
            if tx
                .send(Internal::CheckStarted {
                    generation,
                    character,
                })
                .is_err()
            {
                return;
            }
            let correct = client.verify(&image, character).await;
            if tx
                .send(Internal::Verdict {
                    generation,
                    character,
                    correct,
                })
                .is_err()
                || correct
            {
                return;
            }

            let mut stream = client.stream_correction(image, character);
            while let Some(text) = stream.recv().await {
                if tx.send(Internal::Fragment { generation, text }).is_err() {
                    return;
                }
            }
            let _ = tx.send(Internal::CorrectionDone { generation });
        });
        Ok(())
    }

    fn reset(&mut self) {
        self.debounce_task.cancel();
        self.check_task.cancel();
        self.generation.advance();
        self.surface.clear();
        self.session.reset_drawing();
        self.set_phase(PracticePhase::Idle);
    }

    /// Show what is known about the current character's guide now, and fetch
    /// its geometry if it has never been requested.
    fn load_guide(&mut self) {
        let character = self.session.current().character;
        if let Some(cached) = self.guide_cache.get(&character).cloned() {
            self.guide_task.cancel();
            let mode = self.surface.render_guide(character, cached);
            debug!(%character, ?mode, "Guide served from cache");
            return;
        }

        self.surface.render_guide(character, None);
        let guides = Arc::clone(&self.guides);
        let tx = self.tx.clone();
        self.guide_task.spawn(async move {
            let geometry = guides.fetch(character).await;
            let _ = tx.send(Internal::Guide {
                character,
                geometry,
            });
        });
    }

    fn set_phase(&mut self, phase: PracticePhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "Practice phase");
            self.phase = phase;
        }
    }
}

impl std::fmt::Debug for PracticeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticeController")
            .field("phase", &self.phase)
            .field("current", &self.session.current().character)
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

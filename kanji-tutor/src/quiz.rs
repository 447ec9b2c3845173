//! Test flow.
//!
//! Questions are asked in shuffled order. Each question waits for its
//! generated cloze sentence, accepts exactly one verified answer, and shows
//! feedback until the host moves on. No stroke guide is shown.

use kanji_core::{CharacterRecord, InputEvent, QuizQuestion, TestSessionState};
use kanji_renderer::{DrawingSurface, ImageFormat, InputResponse};
use rand::Rng;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::correction::CorrectionClient;
use crate::error::{TutorError, TutorResult};
use crate::schedule::{Generation, ScheduledTask};

/// Where the test flow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TestPhase {
    /// Waiting for the current question's sentence.
    AwaitingQuiz,
    /// The learner may draw and submit.
    Answering,
    /// Submitted and being verified.
    Checking,
    /// Feedback is shown.
    Submitted {
        /// Outcome of the answer.
        correct: bool,
    },
    /// Every question has been answered.
    Finished,
}

/// Something the host should reflect in its view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestUpdate {
    /// The current question's sentence is ready.
    QuizReady {
        /// The question.
        quiz: QuizQuestion,
    },
    /// The answer was judged.
    Verdict {
        /// Outcome.
        correct: bool,
        /// Feedback line to show.
        message: String,
    },
    /// More correction text for a wrong answer.
    CorrectionFragment {
        /// The new fragment.
        text: String,
    },
    /// Correction text is complete.
    CorrectionFinished,
}

enum Internal {
    Quiz {
        generation: u64,
        quiz: QuizQuestion,
    },
    Verdict {
        generation: u64,
        correct: bool,
    },
    Fragment {
        generation: u64,
        text: String,
    },
    CorrectionDone {
        generation: u64,
    },
}

/// Drives a test session. Construct and use within a Tokio runtime.
pub struct TestController {
    surface: DrawingSurface,
    session: TestSessionState,
    phase: TestPhase,
    client: CorrectionClient,
    export_format: ImageFormat,
    generation: Generation,
    quiz_task: ScheduledTask,
    check_task: ScheduledTask,
    tx: mpsc::UnboundedSender<Internal>,
    rx: mpsc::UnboundedReceiver<Internal>,
}

impl TestController {
    /// Start a test over `questions` in random order.
    ///
    /// # Errors
    ///
    /// Returns an error if `questions` is empty.
    pub fn new(
        surface: DrawingSurface,
        questions: &[CharacterRecord],
        client: CorrectionClient,
    ) -> TutorResult<Self> {
        Self::with_rng(surface, questions, client, &mut rand::thread_rng())
    }

    /// Like [`TestController::new`] with a caller-supplied shuffle source.
    ///
    /// # Errors
    ///
    /// Returns an error if `questions` is empty.
    pub fn with_rng<R: Rng + ?Sized>(
        surface: DrawingSurface,
        questions: &[CharacterRecord],
        client: CorrectionClient,
        rng: &mut R,
    ) -> TutorResult<Self> {
        let session = TestSessionState::shuffled_with(questions, rng)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut controller = Self {
            surface,
            session,
            phase: TestPhase::AwaitingQuiz,
            client,
            export_format: ImageFormat::Png,
            generation: Generation::default(),
            quiz_task: ScheduledTask::new(),
            check_task: ScheduledTask::new(),
            tx,
            rx,
        };
        controller.begin_question();
        Ok(controller)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TestPhase {
        self.phase
    }

    /// Session state (questions, score, feedback).
    #[must_use]
    pub fn session(&self) -> &TestSessionState {
        &self.session
    }

    /// The drawing surface.
    #[must_use]
    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    /// Whether every question has been answered.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == TestPhase::Finished
    }

    /// Feed an input event to the surface. Ignored while feedback is shown.
    pub fn handle_input(&mut self, event: &InputEvent) -> InputResponse {
        match self.phase {
            TestPhase::AwaitingQuiz | TestPhase::Answering => self.surface.handle_input(event),
            TestPhase::Checking | TestPhase::Submitted { .. } | TestPhase::Finished => {
                InputResponse::default()
            }
        }
    }

    /// Erase the drawing while answering.
    pub fn clear(&mut self) {
        if matches!(self.phase, TestPhase::AwaitingQuiz | TestPhase::Answering) {
            self.surface.clear();
        }
    }

    /// Submit the drawing as the answer to the current question.
    ///
    /// # Errors
    ///
    /// - [`TutorError::QuizNotReady`] before the sentence has arrived
    /// - [`TutorError::EmptyCanvas`] if nothing was drawn (no request is made)
    /// - [`TutorError::InvalidState`] if a stroke is in progress, the question
    ///   was already submitted or the test is finished
    pub fn submit(&mut self) -> TutorResult<()> {
        match self.phase {
            TestPhase::Answering => {}
            TestPhase::AwaitingQuiz => return Err(TutorError::QuizNotReady),
            TestPhase::Checking | TestPhase::Submitted { .. } => {
                return Err(TutorError::InvalidState(
                    "question already answered".to_string(),
                ))
            }
            TestPhase::Finished => {
                return Err(TutorError::InvalidState("test is finished".to_string()))
            }
        }
        if self.surface.is_empty() {
            self.session.prompt_for_ink();
            return Err(TutorError::EmptyCanvas);
        }
        if self.surface.is_drawing() {
            return Err(TutorError::InvalidState("stroke in progress".to_string()));
        }
        let Some(target) = self.session.current().map(|record| record.character) else {
            return Err(TutorError::InvalidState("test is finished".to_string()));
        };

        let image = self.surface.export_image(self.export_format)?;
        let generation = self.generation.advance();
        self.phase = TestPhase::Checking;
        debug!(%target, question = self.session.index(), "Answer submitted");

        let client = self.client.clone();
        let tx = self.tx.clone();
        self.check_task.spawn(async move {
            let correct = client.verify(&image, target).await;
            if tx.send(Internal::Verdict { generation, correct }).is_err() || correct {
                return;
            }
            let mut stream = client.stream_correction(image, target);
            while let Some(text) = stream.recv().await {
                if tx.send(Internal::Fragment { generation, text }).is_err() {
                    return;
                }
            }
            let _ = tx.send(Internal::CorrectionDone { generation });
        });
        Ok(())
    }

    /// Move on after feedback. Returns the next question, or `None` when the
    /// test is finished.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::InvalidState`] unless feedback is being shown.
    pub fn next_question(&mut self) -> TutorResult<Option<CharacterRecord>> {
        if !matches!(self.phase, TestPhase::Submitted { .. }) {
            return Err(TutorError::InvalidState(
                "current question not answered".to_string(),
            ));
        }
        self.check_task.cancel();
        let next = self.session.advance()?.copied();
        self.begin_question();
        Ok(next)
    }

    /// Start over with the same questions reshuffled.
    ///
    /// # Errors
    ///
    /// Never fails for a session that was constructed successfully.
    pub fn restart(&mut self) -> TutorResult<()> {
        self.restart_with(&mut rand::thread_rng())
    }

    /// Like [`TestController::restart`] with a caller-supplied shuffle source.
    ///
    /// # Errors
    ///
    /// Never fails for a session that was constructed successfully.
    pub fn restart_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TutorResult<()> {
        let session = TestSessionState::shuffled_with(self.session.questions(), rng)?;
        self.quiz_task.cancel();
        self.check_task.cancel();
        self.session = session;
        self.begin_question();
        Ok(())
    }

    /// Wait for the next result of background work.
    pub async fn next_update(&mut self) -> Option<TestUpdate> {
        while let Some(message) = self.rx.recv().await {
            if let Some(update) = self.apply(message) {
                return Some(update);
            }
        }
        None
    }

    fn apply(&mut self, message: Internal) -> Option<TestUpdate> {
        match message {
            Internal::Quiz { generation, quiz } => {
                if !self.generation.is_current(generation) {
                    return None;
                }
                self.session.set_quiz(quiz.clone());
                self.phase = TestPhase::Answering;
                Some(TestUpdate::QuizReady { quiz })
            }
            Internal::Verdict {
                generation,
                correct,
            } => {
                if !self.generation.is_current(generation) {
                    return None;
                }
                if let Err(e) = self.session.record_result(correct) {
                    warn!(error = %e, "Verdict could not be recorded");
                    return None;
                }
                self.phase = TestPhase::Submitted { correct };
                Some(TestUpdate::Verdict {
                    correct,
                    message: self.session.feedback().message.clone(),
                })
            }
            Internal::Fragment { generation, text } => {
                if !self.generation.is_current(generation) {
                    return None;
                }
                self.session.append_correction(&text);
                Some(TestUpdate::CorrectionFragment { text })
            }
            Internal::CorrectionDone { generation } => self
                .generation
                .is_current(generation)
                .then_some(TestUpdate::CorrectionFinished),
        }
    }

    fn begin_question(&mut self) {
        let generation = self.generation.advance();
        self.surface.clear();
        self.surface.clear_guide();

        let Some(character) = self.session.current().map(|record| record.character) else {
            self.quiz_task.cancel();
            self.phase = TestPhase::Finished;
            info!(score = %self.session.summary(), "Test finished");
            return;
        };

        self.phase = TestPhase::AwaitingQuiz;
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.quiz_task.spawn(async move {
            let quiz = client.generate_quiz(character).await;
            let _ = tx.send(Internal::Quiz { generation, quiz });
        });
    }
}

impl std::fmt::Debug for TestController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestController")
            .field("phase", &self.phase)
            .field("index", &self.session.index())
            .field("score", &self.session.score())
            .finish_non_exhaustive()
    }
}

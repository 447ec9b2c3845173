//! Session state for practice and test modes.
//!
//! These are plain owned structs. The async controllers in `kanji-tutor`
//! hold one of each kind and mutate it in response to user input and
//! completed requests.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{characters_for_grade, CharacterRecord, Grade, KanjiError, KanjiResult};

/// Shown when a test answer is verified correct.
pub const CORRECT_MESSAGE: &str = "せいかい！";

/// Shown when a submission is attempted on an empty canvas.
pub const EMPTY_CANVAS_MESSAGE: &str = "なにか かいてね！";

/// Unique identifier for a practice or test session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A generated fill-in-the-blank question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Sentence with the target blanked out as `（　）`.
    pub sentence: String,
    /// The character that fills the blank.
    pub answer: String,
}

/// State of one practice session: a character list and a cursor.
#[derive(Debug, Clone, Serialize)]
pub struct PracticeSessionState {
    /// Session identifier.
    pub id: SessionId,
    characters: Vec<CharacterRecord>,
    index: usize,
    /// Whether ink has been drawn since the last clear.
    pub has_ink: bool,
    correction: Option<String>,
    verdict: Option<bool>,
}

impl PracticeSessionState {
    /// Start a session over `characters`.
    ///
    /// # Errors
    ///
    /// Returns [`KanjiError::InvalidOperation`] if the list is empty.
    pub fn new(characters: Vec<CharacterRecord>) -> KanjiResult<Self> {
        if characters.is_empty() {
            return Err(KanjiError::InvalidOperation(
                "practice list is empty".to_string(),
            ));
        }
        Ok(Self {
            id: SessionId::new(),
            characters,
            index: 0,
            has_ink: false,
            correction: None,
            verdict: None,
        })
    }

    /// Start a session over a grade's curriculum.
    #[must_use]
    pub fn for_grade(grade: Grade) -> Self {
        Self {
            id: SessionId::new(),
            characters: characters_for_grade(grade).to_vec(),
            index: 0,
            has_ink: false,
            correction: None,
            verdict: None,
        }
    }

    /// The character being practised.
    #[must_use]
    pub fn current(&self) -> &CharacterRecord {
        &self.characters[self.index]
    }

    /// Cursor position, always `< len()`.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of characters in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Always false: sessions are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Move to the next character, wrapping at the end.
    pub fn advance(&mut self) -> &CharacterRecord {
        self.index = (self.index + 1) % self.characters.len();
        self.reset_drawing();
        self.current()
    }

    /// Move to the previous character, wrapping at the start.
    pub fn retreat(&mut self) -> &CharacterRecord {
        let len = self.characters.len();
        self.index = (self.index + len - 1) % len;
        self.reset_drawing();
        self.current()
    }

    /// Forget ink and any correction.
    pub fn reset_drawing(&mut self) {
        self.has_ink = false;
        self.correction = None;
        self.verdict = None;
    }

    /// Drop the correction but keep the ink flag.
    pub fn dismiss_correction(&mut self) {
        self.correction = None;
        self.verdict = None;
    }

    /// Start accumulating a new correction.
    pub fn begin_correction(&mut self) {
        self.correction = Some(String::new());
        self.verdict = None;
    }

    /// Append a streamed fragment to the current correction.
    pub fn append_correction(&mut self, fragment: &str) {
        self.correction
            .get_or_insert_with(String::new)
            .push_str(fragment);
    }

    /// Record the verification outcome.
    pub fn set_verdict(&mut self, passed: bool) {
        self.verdict = Some(passed);
    }

    /// Correction text accumulated so far.
    #[must_use]
    pub fn correction(&self) -> Option<&str> {
        self.correction.as_deref()
    }

    /// Outcome of the last completed check.
    #[must_use]
    pub fn verdict(&self) -> Option<bool> {
        self.verdict
    }
}

/// Result shown for the current test question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    /// Not yet submitted.
    #[default]
    Idle,
    /// Verified correct.
    Correct,
    /// Rejected.
    Incorrect,
}

/// Per-question feedback.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feedback {
    /// Outcome.
    pub status: FeedbackStatus,
    /// Short headline message.
    pub message: String,
    /// Streamed correction text for incorrect answers.
    pub correction: Option<String>,
}

/// State of one test session.
#[derive(Debug, Clone, Serialize)]
pub struct TestSessionState {
    /// Session identifier.
    pub id: SessionId,
    questions: Vec<CharacterRecord>,
    index: usize,
    score: usize,
    feedback: Feedback,
    quiz: Option<QuizQuestion>,
}

impl TestSessionState {
    /// Shuffle `source` into a new session using the thread RNG.
    ///
    /// # Errors
    ///
    /// Returns [`KanjiError::InvalidOperation`] if `source` is empty.
    pub fn shuffled(source: &[CharacterRecord]) -> KanjiResult<Self> {
        Self::shuffled_with(source, &mut rand::thread_rng())
    }

    /// Shuffle `source` into a new session with the given RNG.
    ///
    /// # Errors
    ///
    /// Returns [`KanjiError::InvalidOperation`] if `source` is empty.
    pub fn shuffled_with<R: Rng + ?Sized>(
        source: &[CharacterRecord],
        rng: &mut R,
    ) -> KanjiResult<Self> {
        if source.is_empty() {
            return Err(KanjiError::InvalidOperation("test list is empty".to_string()));
        }
        let mut questions = source.to_vec();
        questions.shuffle(rng);
        Ok(Self {
            id: SessionId::new(),
            questions,
            index: 0,
            score: 0,
            feedback: Feedback::default(),
            quiz: None,
        })
    }

    /// Questions in session order.
    #[must_use]
    pub fn questions(&self) -> &[CharacterRecord] {
        &self.questions
    }

    /// Current question, or `None` once finished.
    #[must_use]
    pub fn current(&self) -> Option<&CharacterRecord> {
        self.questions.get(self.index)
    }

    /// Zero-based question index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of questions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Correct answers so far.
    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    /// True once every question has been answered and advanced past.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.index >= self.questions.len()
    }

    /// Feedback for the current question.
    #[must_use]
    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    /// Quiz sentence for the current question, once loaded.
    #[must_use]
    pub fn quiz(&self) -> Option<&QuizQuestion> {
        self.quiz.as_ref()
    }

    /// Attach the generated quiz sentence for the current question.
    pub fn set_quiz(&mut self, quiz: QuizQuestion) {
        self.quiz = Some(quiz);
    }

    /// Ask for a drawing after an empty submission. Leaves the question
    /// unanswered.
    pub fn prompt_for_ink(&mut self) {
        if self.feedback.status == FeedbackStatus::Idle {
            self.feedback.message = EMPTY_CANVAS_MESSAGE.to_string();
        }
    }

    /// Record the verified outcome of the current question.
    ///
    /// # Errors
    ///
    /// Returns [`KanjiError::InvalidOperation`] if the session is finished or
    /// the question was already answered.
    pub fn record_result(&mut self, correct: bool) -> KanjiResult<()> {
        let Some(question) = self.current() else {
            return Err(KanjiError::InvalidOperation("test is finished".to_string()));
        };
        if self.feedback.status != FeedbackStatus::Idle {
            return Err(KanjiError::InvalidOperation(
                "question already answered".to_string(),
            ));
        }

        self.feedback = if correct {
            Feedback {
                status: FeedbackStatus::Correct,
                message: CORRECT_MESSAGE.to_string(),
                correction: None,
            }
        } else {
            Feedback {
                status: FeedbackStatus::Incorrect,
                message: format!("ちがうよ。こたえは「{}」", question.character),
                correction: None,
            }
        };
        if correct {
            self.score += 1;
        }
        Ok(())
    }

    /// Append a streamed correction fragment to an incorrect answer.
    pub fn append_correction(&mut self, fragment: &str) {
        if self.feedback.status == FeedbackStatus::Incorrect {
            self.feedback
                .correction
                .get_or_insert_with(String::new)
                .push_str(fragment);
        }
    }

    /// Move to the next question after feedback was shown.
    ///
    /// # Errors
    ///
    /// Returns [`KanjiError::InvalidOperation`] if the current question has
    /// not been answered or the session is already finished.
    pub fn advance(&mut self) -> KanjiResult<Option<&CharacterRecord>> {
        if self.is_finished() {
            return Err(KanjiError::InvalidOperation("test is finished".to_string()));
        }
        if self.feedback.status == FeedbackStatus::Idle {
            return Err(KanjiError::InvalidOperation(
                "current question not answered".to_string(),
            ));
        }
        self.index += 1;
        self.feedback = Feedback::default();
        self.quiz = None;
        Ok(self.current())
    }

    /// Final score line, e.g. `3 / 3`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} / {}", self.score, self.questions.len())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn grade_one() -> &'static [CharacterRecord] {
        characters_for_grade(Grade::FIRST)
    }

    #[test]
    fn test_practice_navigation_wraps() {
        let mut state = PracticeSessionState::for_grade(Grade::FIRST);
        let len = state.len();
        assert_eq!(state.current().character, '一');

        state.retreat();
        assert_eq!(state.index(), len - 1);
        state.advance();
        assert_eq!(state.index(), 0);
        state.advance();
        assert_eq!(state.current().character, '二');
    }

    #[test]
    fn test_practice_navigation_resets_drawing() {
        let mut state = PracticeSessionState::for_grade(Grade::FIRST);
        state.has_ink = true;
        state.begin_correction();
        state.append_correction("よく");
        state.append_correction("できたね");
        assert_eq!(state.correction(), Some("よくできたね"));

        state.advance();
        assert!(!state.has_ink);
        assert_eq!(state.correction(), None);
    }

    #[test]
    fn test_practice_rejects_empty_list() {
        assert!(PracticeSessionState::new(Vec::new()).is_err());
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let state = TestSessionState::shuffled_with(grade_one(), &mut rng).expect("session");

        let mut shuffled: Vec<char> = state.questions().iter().map(|r| r.character).collect();
        let mut original: Vec<char> = grade_one().iter().map(|r| r.character).collect();
        shuffled.sort_unstable();
        original.sort_unstable();
        assert_eq!(shuffled, original);
    }

    #[test]
    fn test_scoring_counts_correct_only() {
        let mut state = TestSessionState::shuffled(&grade_one()[..3]).expect("session");
        let outcomes = [true, false, true];
        for correct in outcomes {
            state.record_result(correct).expect("record");
            assert!(state.record_result(true).is_err(), "double submit");
            state.advance().expect("advance");
        }
        assert!(state.is_finished());
        assert_eq!(state.score(), 2);
        assert_eq!(state.summary(), "2 / 3");
        assert!(state.record_result(true).is_err());
        assert!(state.advance().is_err());
    }

    #[test]
    fn test_incorrect_feedback_names_answer_and_collects_correction() {
        let mut state = TestSessionState::shuffled(&grade_one()[..1]).expect("session");
        state.record_result(false).expect("record");
        assert_eq!(state.feedback().status, FeedbackStatus::Incorrect);
        assert_eq!(state.feedback().message, "ちがうよ。こたえは「一」");

        state.append_correction("よこ");
        state.append_correction("ぼう");
        assert_eq!(state.feedback().correction.as_deref(), Some("よこぼう"));
    }

    #[test]
    fn test_empty_prompt_keeps_question_open() {
        let mut session = TestSessionState::shuffled(grade_one()).expect("session");
        session.prompt_for_ink();
        assert_eq!(session.feedback().status, FeedbackStatus::Idle);
        assert_eq!(session.feedback().message, EMPTY_CANVAS_MESSAGE);
        session.record_result(true).expect("record");
        assert_eq!(session.feedback().message, CORRECT_MESSAGE);
    }

    #[test]
    fn test_advance_requires_answer() {
        let mut state = TestSessionState::shuffled(grade_one()).expect("session");
        assert!(state.advance().is_err());
        state.set_quiz(QuizQuestion {
            sentence: "（　）".to_string(),
            answer: "一".to_string(),
        });
        state.record_result(true).expect("record");
        state.advance().expect("advance");
        assert!(state.quiz().is_none());
        assert_eq!(state.feedback().status, FeedbackStatus::Idle);
    }
}

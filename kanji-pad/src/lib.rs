//! # Kanji Pad
//!
//! Command-line host for the Kanji Pad practice surface.
//!
//! ## Usage
//!
//! ```bash
//! kanji-pad list --grade 1
//! kanji-pad guide 二 --out ni.png
//! GEMINI_API_KEY=... kanji-pad check drawing.png --target 二
//! GEMINI_API_KEY=... kanji-pad replay session.json
//! GEMINI_API_KEY=... kanji-pad test answers.json --grade 1 --count 5
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `PadConfig` - Surface size and tutor settings resolved from flags and
//!   the environment
//! - `ReplayStep` - One action of a scripted practice session
//! - `TestStep` - One action of a scripted test session

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use kanji_core::{InputEvent, LogicalSize};
use kanji_tutor::TutorConfig;
use serde::Deserialize;

/// Command-line arguments for kanji-pad.
#[derive(Debug, Clone, Parser)]
#[command(name = "kanji-pad")]
#[command(about = "Kanji handwriting practice with stroke guides and AI correction")]
#[command(version)]
pub struct CliArgs {
    /// Model API key (falls back to `GEMINI_API_KEY`)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model name (falls back to `KANJI_MODEL`)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of stroke documents (falls back to `KANJI_GUIDE_URL`)
    #[arg(long, global = true)]
    pub guide_url: Option<String>,

    /// Skip stroke document downloads and always draw the plain glyph
    #[arg(long, global = true)]
    pub offline: bool,

    /// Surface side length in logical pixels
    #[arg(long, global = true, default_value = "300")]
    pub size: f32,

    /// Device pixel ratio of the backing buffers
    #[arg(long, global = true, default_value = "1")]
    pub dpr: f32,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List grades and how many characters each teaches
    Grades,

    /// List the characters of a grade with readings and example words
    List {
        /// Grade (1-6)
        #[arg(long, short, default_value = "1")]
        grade: u8,
    },

    /// Render a character's stroke-order guide to a PNG file
    Guide {
        /// The character
        character: char,
        /// Output file
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Check a drawing against a target character
    Check {
        /// PNG or JPEG of the drawing
        image: PathBuf,
        /// Character the drawing should show
        #[arg(long, short)]
        target: char,
        /// Also ask the model which character it sees
        #[arg(long)]
        recognize: bool,
    },

    /// Generate a fill-in-the-blank question
    Quiz {
        /// The answer character
        character: char,
    },

    /// Generate example words
    Examples {
        /// The character
        character: char,
    },

    /// Drive a practice session from a JSON script of input steps
    Replay {
        /// Script file: a JSON array of steps
        script: PathBuf,
        /// Grade whose characters are practised
        #[arg(long, short, default_value = "1")]
        grade: u8,
        /// How long to keep collecting results after the last step
        #[arg(long, default_value = "5000")]
        settle_ms: u64,
        /// Write the final composite (guide and ink) to this PNG
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Take a scored test: shuffled cloze questions answered by a JSON
    /// script of input steps
    Test {
        /// Script file: a JSON array of steps
        script: PathBuf,
        /// Grade whose characters are asked
        #[arg(long, short, default_value = "1")]
        grade: u8,
        /// Ask only this many characters of the grade
        #[arg(long, short)]
        count: Option<usize>,
        /// Seed for the question order
        #[arg(long)]
        seed: Option<u64>,
        /// Longest wait for a question or verdict to arrive
        #[arg(long, default_value = "30000")]
        settle_ms: u64,
    },
}

/// Resolved settings for a run.
#[derive(Debug, Clone)]
pub struct PadConfig {
    /// Tutor settings.
    pub tutor: TutorConfig,
    /// Logical surface size.
    pub size: LogicalSize,
    /// Device pixel ratio.
    pub device_pixel_ratio: f32,
    /// Whether stroke documents are fetched.
    pub fetch_guides: bool,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            tutor: TutorConfig::default(),
            size: LogicalSize::square(300.0),
            device_pixel_ratio: 1.0,
            fetch_guides: true,
        }
    }
}

impl From<&CliArgs> for PadConfig {
    fn from(args: &CliArgs) -> Self {
        let mut tutor = TutorConfig::from_env();
        if let Some(key) = &args.api_key {
            tutor.api_key = Some(key.clone());
        }
        if let Some(model) = &args.model {
            tutor.model.clone_from(model);
        }
        if let Some(url) = &args.guide_url {
            tutor.guide_base_url.clone_from(url);
        }
        Self {
            tutor,
            size: LogicalSize::square(args.size),
            device_pixel_ratio: args.dpr,
            fetch_guides: !args.offline,
        }
    }
}

/// One action in a replay script.
///
/// ```json
/// [
///   { "action": "input", "event": { "type": "Pointer", "data": {
///       "kind": "mouse", "phase": "down", "client_x": 40, "client_y": 150 } } },
///   { "action": "wait", "ms": 2000 },
///   { "action": "next" }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReplayStep {
    /// Feed an input event.
    Input {
        /// The event.
        event: InputEvent,
    },
    /// Let time pass, reporting results as they arrive.
    Wait {
        /// Milliseconds.
        ms: u64,
    },
    /// Check now.
    Submit,
    /// Erase the drawing.
    Clear,
    /// Next character.
    Next,
    /// Previous character.
    Previous,
    /// Container resize.
    Resize {
        /// New logical width.
        width: f32,
        /// New logical height.
        height: f32,
        /// New device pixel ratio.
        #[serde(default = "default_dpr")]
        dpr: f32,
    },
}

impl ReplayStep {
    /// Time to wait after this step, if it is a wait.
    #[must_use]
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Self::Wait { ms } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }
}

/// One action in a test script.
///
/// Each `submit`, `next` and `restart` waits for the flow to come to rest
/// (question shown, or verdict and correction complete) before the next step.
///
/// ```json
/// [
///   { "action": "input", "event": { "type": "Pointer", "data": {
///       "kind": "mouse", "phase": "down", "client_x": 40, "client_y": 150 } } },
///   { "action": "submit" },
///   { "action": "next" }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Feed an input event.
    Input {
        /// The event.
        event: InputEvent,
    },
    /// Submit the drawing as the answer.
    Submit,
    /// Erase the drawing.
    Clear,
    /// Move on to the next question.
    Next,
    /// Start over with the questions reshuffled.
    Restart,
}

fn default_dpr() -> f32 {
    1.0
}

/// Parse a replay script.
///
/// # Errors
///
/// Returns an error if the text is not a JSON array of steps.
pub fn parse_script(text: &str) -> serde_json::Result<Vec<ReplayStep>> {
    serde_json::from_str(text)
}

/// Parse a test script.
///
/// # Errors
///
/// Returns an error if the text is not a JSON array of test steps.
pub fn parse_test_script(text: &str) -> serde_json::Result<Vec<TestStep>> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use kanji_core::{PointerKind, PointerPhase};

    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "kanji-pad", "guide", "二", "--out", "ni.png", "--offline", "--dpr", "2",
        ])
        .expect("parse");
        assert!(args.offline);
        assert!((args.dpr - 2.0).abs() < f32::EPSILON);
        assert!(matches!(
            args.command,
            Command::Guide { character: '二', .. }
        ));
    }

    #[test]
    fn test_config_applies_flag_overrides() {
        let args = CliArgs::try_parse_from([
            "kanji-pad",
            "--api-key",
            "k",
            "--model",
            "other-model",
            "--size",
            "400",
            "grades",
        ])
        .expect("parse");
        let config = PadConfig::from(&args);
        assert_eq!(config.tutor.api_key.as_deref(), Some("k"));
        assert_eq!(config.tutor.model, "other-model");
        assert_eq!(config.size, LogicalSize::square(400.0));
        assert!(config.fetch_guides);
    }

    #[test]
    fn test_check_requires_target() {
        assert!(CliArgs::try_parse_from(["kanji-pad", "check", "a.png"]).is_err());
    }

    #[test]
    fn test_parse_script() {
        let steps = parse_script(
            r#"[
                {"action": "input", "event": {"type": "Pointer", "data": {
                    "kind": "pen", "phase": "down", "client_x": 10, "client_y": 20}}},
                {"action": "wait", "ms": 1500},
                {"action": "resize", "width": 320, "height": 320},
                {"action": "submit"}
            ]"#,
        )
        .expect("script");

        assert_eq!(steps.len(), 4);
        assert_eq!(
            steps[0],
            ReplayStep::Input {
                event: InputEvent::Pointer {
                    kind: PointerKind::Pen,
                    phase: PointerPhase::Down,
                    client_x: 10.0,
                    client_y: 20.0,
                }
            }
        );
        assert_eq!(steps[1].wait(), Some(Duration::from_millis(1500)));
        assert!(matches!(steps[2], ReplayStep::Resize { dpr, .. } if (dpr - 1.0).abs() < f32::EPSILON));
        assert_eq!(steps[3], ReplayStep::Submit);
    }

    #[test]
    fn test_cli_parses_test_command() {
        let args = CliArgs::try_parse_from([
            "kanji-pad", "test", "answers.json", "--grade", "2", "--count", "5", "--seed", "7",
        ])
        .expect("parse");
        assert!(matches!(
            args.command,
            Command::Test {
                grade: 2,
                count: Some(5),
                seed: Some(7),
                settle_ms: 30_000,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_test_script() {
        let steps = parse_test_script(
            r#"[
                {"action": "input", "event": {"type": "Pointer", "data": {
                    "kind": "mouse", "phase": "up", "client_x": 10, "client_y": 20}}},
                {"action": "submit"},
                {"action": "next"},
                {"action": "restart"}
            ]"#,
        )
        .expect("script");
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[1], TestStep::Submit);
        assert_eq!(steps[3], TestStep::Restart);
        assert!(parse_test_script(r#"[{"action": "previous"}]"#).is_err());
    }

    #[test]
    fn test_parse_script_rejects_unknown_action() {
        assert!(parse_script(r#"[{"action": "erase_everything"}]"#).is_err());
    }
}

//! # Kanji Pad
//!
//! Command-line host for the practice surface and tutor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use kanji_core::state::EMPTY_CANVAS_MESSAGE;
use kanji_core::{characters_for_grade, Grade, LogicalSize, PracticeSessionState, SurfaceMetrics};
use kanji_pad::{
    parse_script, parse_test_script, CliArgs, Command, PadConfig, ReplayStep, TestStep,
};
use kanji_renderer::{DrawingSurface, ExportedImage, ImageFormat};
use kanji_tutor::{
    CorrectionClient, GeminiModel, KanjiVgSource, NoGuides, PracticeController, PracticeOptions,
    StrokeSource, TestController, TestUpdate, TutorConfig, TutorError, PRAISE,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing.
///
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,kanji_pad=info,kanji_tutor=info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = PadConfig::from(&args);
    tracing::debug!(?config, "Resolved configuration");

    match args.command {
        Command::Grades => list_grades(),
        Command::List { grade } => list_characters(Grade::new(grade)?),
        Command::Guide { character, out } => {
            let mut surface = new_surface(&config)?;
            let geometry = guide_source(&config)?.fetch(character).await;
            let mode = surface.render_guide(character, geometry);
            let image = surface.export_composite(ImageFormat::Png)?;
            std::fs::write(&out, &image.bytes)
                .with_context(|| format!("writing {}", out.display()))?;
            tracing::info!(%character, ?mode, path = %out.display(), "Guide written");
        }
        Command::Check {
            image,
            target,
            recognize,
        } => {
            let bytes =
                std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let image = ExportedImage::from_encoded(bytes)?;
            let client = correction_client(&config.tutor)?;
            if recognize {
                println!("recognized: {}", client.recognize(&image).await);
            }
            if client.verify(&image, target).await {
                println!("{PRAISE}");
            } else {
                let mut stream = client.stream_correction(image, target);
                while let Some(fragment) = stream.recv().await {
                    print!("{fragment}");
                }
                println!();
            }
        }
        Command::Quiz { character } => {
            let quiz = correction_client(&config.tutor)?
                .generate_quiz(character)
                .await;
            println!("{}", serde_json::to_string_pretty(&quiz)?);
        }
        Command::Examples { character } => {
            let examples = correction_client(&config.tutor)?
                .generate_examples(character)
                .await;
            for example in examples {
                println!("{example}");
            }
        }
        Command::Replay {
            script,
            grade,
            settle_ms,
            out,
        } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let steps = parse_script(&text).context("parsing replay script")?;
            let session = PracticeSessionState::for_grade(Grade::new(grade)?);
            let mut controller = PracticeController::new(
                new_surface(&config)?,
                session,
                correction_client(&config.tutor)?,
                guide_source(&config)?,
                PracticeOptions::from(&config.tutor),
            );
            replay(&mut controller, &steps, Duration::from_millis(settle_ms)).await?;

            if let Some(out) = out {
                let image = controller.surface().export_composite(ImageFormat::Png)?;
                std::fs::write(&out, &image.bytes)
                    .with_context(|| format!("writing {}", out.display()))?;
            }
        }
        Command::Test {
            script,
            grade,
            count,
            seed,
            settle_ms,
        } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let steps = parse_test_script(&text).context("parsing test script")?;
            let records = characters_for_grade(Grade::new(grade)?);
            let records = &records[..count.unwrap_or(records.len()).min(records.len())];
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut controller = TestController::with_rng(
                new_surface(&config)?,
                records,
                correction_client(&config.tutor)?,
                &mut rng,
            )?;
            take_test(&mut controller, &steps, Duration::from_millis(settle_ms)).await?;
            println!("score: {}", controller.session().summary());
        }
    }
    Ok(())
}

fn list_grades() {
    for grade in Grade::all() {
        println!("grade {grade}: {} characters", characters_for_grade(grade).len());
    }
}

fn list_characters(grade: Grade) {
    for record in characters_for_grade(grade) {
        let examples: Vec<String> = record
            .example_words()
            .map(|w| match w.reading {
                Some(reading) => format!("{} ({reading})", w.word),
                None => w.word.to_string(),
            })
            .collect();
        println!(
            "{}  {}  {}  {}",
            record.character,
            record.reading,
            record.meaning,
            examples.join(", ")
        );
    }
}

fn new_surface(config: &PadConfig) -> anyhow::Result<DrawingSurface> {
    let metrics = SurfaceMetrics::new(config.size, config.device_pixel_ratio);
    Ok(DrawingSurface::new(metrics)?)
}

fn guide_source(config: &PadConfig) -> anyhow::Result<Arc<dyn StrokeSource>> {
    if config.fetch_guides {
        Ok(Arc::new(KanjiVgSource::new(&config.tutor)?))
    } else {
        Ok(Arc::new(NoGuides))
    }
}

fn correction_client(config: &TutorConfig) -> anyhow::Result<CorrectionClient> {
    if !config.is_configured() {
        tracing::warn!("GEMINI_API_KEY is not set; checks will fail softly");
    }
    Ok(CorrectionClient::new(Arc::new(GeminiModel::new(config)?)))
}

async fn replay(
    controller: &mut PracticeController,
    steps: &[ReplayStep],
    settle: Duration,
) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(&controller.current())?);
    for step in steps {
        match step {
            ReplayStep::Input { event } => {
                controller.handle_input(event);
            }
            ReplayStep::Wait { .. } => {}
            ReplayStep::Submit => {
                match controller.submit() {
                    Ok(()) => {}
                    Err(TutorError::EmptyCanvas) => println!("{EMPTY_CANVAS_MESSAGE}"),
                    Err(e) => return Err(e.into()),
                }
            }
            ReplayStep::Clear => controller.clear(),
            ReplayStep::Next => {
                println!("{}", serde_json::to_string(&controller.next_character())?);
            }
            ReplayStep::Previous => {
                println!("{}", serde_json::to_string(&controller.previous_character())?);
            }
            ReplayStep::Resize { width, height, dpr } => {
                controller.observe_resize(LogicalSize::new(*width, *height), *dpr);
            }
        }
        if let Some(wait) = step.wait() {
            drain_updates(controller, wait).await?;
        }
    }
    drain_updates(controller, settle).await
}

async fn take_test(
    controller: &mut TestController,
    steps: &[TestStep],
    settle: Duration,
) -> anyhow::Result<()> {
    settle_test(controller, settle).await?;
    for step in steps {
        match step {
            TestStep::Input { event } => {
                controller.handle_input(event);
                continue;
            }
            TestStep::Clear => {
                controller.clear();
                continue;
            }
            TestStep::Submit => match controller.submit() {
                Ok(()) => {}
                Err(TutorError::EmptyCanvas) => {
                    println!("{EMPTY_CANVAS_MESSAGE}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            },
            TestStep::Next => match controller.next_question()? {
                Some(record) => println!("{}", serde_json::to_string(&record)?),
                None => {
                    tracing::info!(score = controller.session().score(), "Test finished");
                    continue;
                }
            },
            TestStep::Restart => controller.restart()?,
        }
        settle_test(controller, settle).await?;
    }
    Ok(())
}

/// Print test updates as JSON lines until the flow rests: a question is
/// shown, a correct verdict arrives, or a correction is complete.
async fn settle_test(controller: &mut TestController, limit: Duration) -> anyhow::Result<()> {
    let deadline = Instant::now() + limit;
    while let Ok(Some(update)) = tokio::time::timeout_at(deadline, controller.next_update()).await {
        println!("{}", serde_json::to_string(&update)?);
        let resting = match &update {
            TestUpdate::QuizReady { .. } | TestUpdate::CorrectionFinished => true,
            TestUpdate::Verdict { correct, .. } => *correct,
            TestUpdate::CorrectionFragment { .. } => false,
        };
        if resting {
            break;
        }
    }
    Ok(())
}

/// Print updates as JSON lines until `window` has elapsed.
async fn drain_updates(controller: &mut PracticeController, window: Duration) -> anyhow::Result<()> {
    let deadline = Instant::now() + window;
    while let Ok(Some(update)) = tokio::time::timeout_at(deadline, controller.next_update()).await {
        println!("{}", serde_json::to_string(&update)?);
    }
    if let Some(correction) = controller.session().correction() {
        tracing::debug!(%correction, phase = ?controller.phase(), "Correction so far");
    }
    Ok(())
}

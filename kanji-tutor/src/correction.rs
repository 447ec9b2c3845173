//! Correction and verification client.
//!
//! Wraps a [`TutorModel`] with the degrade semantics the flows rely on:
//! nothing here returns an error. Failures become an empty recognition, a
//! negative verdict, an apology, a placeholder question, or the curriculum's
//! own example words.

use std::sync::Arc;

use futures::StreamExt;
use kanji_core::{find_character, QuizQuestion};
use kanji_renderer::ExportedImage;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::model::TutorModel;

/// Yielded in place of a correction when the service cannot be reached.
pub const APOLOGY: &str =
    "ごめんね、いまは アドバイスが だせないよ。もういちど ためしてみてね。";

const FRAGMENT_BUFFER: usize = 32;

/// Cheaply cloneable front end to the tutor model.
#[derive(Clone)]
pub struct CorrectionClient {
    model: Arc<dyn TutorModel>,
}

impl CorrectionClient {
    /// Wrap a model.
    #[must_use]
    pub fn new(model: Arc<dyn TutorModel>) -> Self {
        Self { model }
    }

    /// First character of the model's trimmed answer, or empty on failure.
    pub async fn recognize(&self, image: &ExportedImage) -> String {
        match self.model.recognize(image).await {
            Ok(text) => text
                .trim()
                .chars()
                .next()
                .map(String::from)
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Recognition failed");
                String::new()
            }
        }
    }

    /// Whether the drawing is a correct rendition of `target`. Any failure
    /// counts as incorrect.
    pub async fn verify(&self, image: &ExportedImage, target: char) -> bool {
        match self.model.verify(image, target).await {
            Ok(verdict) => {
                debug!(%target, correct = verdict.is_correct, "Verification finished");
                verdict.is_correct
            }
            Err(e) => {
                warn!(%target, error = %e, "Verification failed");
                false
            }
        }
    }

    /// Start streaming correction text for `target`.
    ///
    /// Must be called within a Tokio runtime. The request runs in a
    /// background task that stops when the stream is cancelled or dropped.
    pub fn stream_correction(&self, image: ExportedImage, target: char) -> CorrectionStream {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let cancel = CancelHandle::new();
        let mut cancelled = cancel.subscribe();
        let model = Arc::clone(&self.model);

        tokio::spawn(async move {
            let produce = async {
                let mut fragments = match model.stream_correction(&image, target).await {
                    Ok(fragments) => fragments,
                    Err(e) => {
                        warn!(%target, error = %e, "Correction request failed");
                        let _ = tx.send(APOLOGY.to_string()).await;
                        return;
                    }
                };

                let mut sent_any = false;
                while let Some(item) = fragments.next().await {
                    match item {
                        Ok(text) => {
                            if tx.send(text).await.is_err() {
                                return;
                            }
                            sent_any = true;
                        }
                        Err(e) => {
                            warn!(%target, error = %e, "Correction stream broke");
                            if !sent_any {
                                let _ = tx.send(APOLOGY.to_string()).await;
                            }
                            return;
                        }
                    }
                }
            };

            tokio::select! {
                biased;
                () = wait_cancelled(&mut cancelled) => debug!(%target, "Correction cancelled"),
                () = produce => {}
            }
        });

        CorrectionStream { rx, cancel }
    }

    /// A cloze question for `character`, or a placeholder on failure.
    pub async fn generate_quiz(&self, character: char) -> QuizQuestion {
        match self.model.generate_quiz(character).await {
            Ok(quiz) if quiz.sentence.contains("（　）") => quiz,
            Ok(quiz) => {
                warn!(%character, sentence = %quiz.sentence, "Quiz sentence has no blank");
                placeholder_quiz(character)
            }
            Err(e) => {
                warn!(%character, error = %e, "Quiz generation failed");
                placeholder_quiz(character)
            }
        }
    }

    /// Example words for `character`, falling back to the curriculum's.
    pub async fn generate_examples(&self, character: char) -> Vec<String> {
        match self.model.generate_examples(character).await {
            Ok(examples) if !examples.is_empty() => examples,
            Ok(_) => static_examples(character),
            Err(e) => {
                warn!(%character, error = %e, "Example generation failed");
                static_examples(character)
            }
        }
    }
}

impl std::fmt::Debug for CorrectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectionClient").finish_non_exhaustive()
    }
}

/// Question used when generation fails: asks for the character by reading.
#[must_use]
pub fn placeholder_quiz(character: char) -> QuizQuestion {
    let sentence = match find_character(character) {
        Some(record) => format!("「{}」と よむ かんじは（　）です。", record.reading),
        None => "（　）を かいてね。".to_string(),
    };
    QuizQuestion {
        sentence,
        answer: character.to_string(),
    }
}

fn static_examples(character: char) -> Vec<String> {
    find_character(character)
        .map(|record| record.examples.iter().map(|e| (*e).to_string()).collect())
        .unwrap_or_default()
}

/// Cancels a [`CorrectionStream`] from anywhere.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Stop the stream. No fragment is yielded after this returns.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`CancelHandle::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        // Sender gone without cancelling: never resolve.
        std::future::pending::<()>().await;
    }
}

/// Ordered correction fragments.
#[derive(Debug)]
pub struct CorrectionStream {
    rx: mpsc::Receiver<String>,
    cancel: CancelHandle,
}

impl CorrectionStream {
    /// Handle that cancels this stream.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Next fragment, or `None` when finished or cancelled.
    pub async fn recv(&mut self) -> Option<String> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let mut cancelled = self.cancel.subscribe();
        tokio::select! {
            biased;
            () = wait_cancelled(&mut cancelled) => None,
            fragment = self.rx.recv() => {
                if self.cancel.is_cancelled() { None } else { fragment }
            }
        }
    }

    /// Drain the stream into one string.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(fragment) = self.recv().await {
            text.push_str(&fragment);
        }
        text
    }
}

impl Drop for CorrectionStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

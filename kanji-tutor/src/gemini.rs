//! Gemini `generateContent` REST client.
//!
//! Structured queries (verification, quiz, examples) set
//! `responseMimeType: application/json` with a `responseSchema` and decode
//! the returned text with serde. Corrections use `streamGenerateContent` with
//! server-sent events.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use kanji_core::QuizQuestion;
use kanji_renderer::ExportedImage;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::TutorConfig;
use crate::error::{TutorError, TutorResult};
use crate::model::{FragmentStream, TutorModel, Verdict};
use crate::prompts;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Production [`TutorModel`] backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiModel {
    http: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
}

impl GeminiModel {
    /// Build a client from configuration.
    ///
    /// A missing API key is not an error here; requests fail with
    /// [`TutorError::NotConfigured`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::InvalidUrl`] for a malformed endpoint and
    /// [`TutorError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &TutorConfig) -> TutorResult<Self> {
        Self::with_client(config, config.http_client()?)
    }

    /// Build a client that reuses an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::InvalidUrl`] for a malformed endpoint.
    pub fn with_client(config: &TutorConfig, http: Client) -> TutorResult<Self> {
        let trimmed = config.api_endpoint.trim().trim_end_matches('/');
        let endpoint = Url::parse(trimmed).map_err(|e| TutorError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http,
            endpoint,
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    /// Model name requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{method}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.model
        )
    }

    fn api_key(&self) -> TutorResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(TutorError::NotConfigured("GEMINI_API_KEY"))
    }

    async fn post(&self, url: &str, body: &GenerateRequest) -> TutorResult<reqwest::Response> {
        let api_key = self.api_key()?;
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TutorError::HttpStatus { status, body })
        }
    }

    async fn generate_text(&self, body: &GenerateRequest) -> TutorResult<String> {
        let url = self.method_url("generateContent");
        let bytes = self.post(&url, body).await?.bytes().await?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)?;
        parsed.text().ok_or_else(|| {
            TutorError::UnexpectedResponse("response contained no candidate text".to_string())
        })
    }

    async fn generate_json<T: DeserializeOwned>(&self, body: &GenerateRequest) -> TutorResult<T> {
        let text = self.generate_text(body).await?;
        serde_json::from_str(strip_code_fence(&text)).map_err(TutorError::from)
    }
}

impl std::fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModel")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("configured", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TutorModel for GeminiModel {
    async fn recognize(&self, image: &ExportedImage) -> TutorResult<String> {
        let body = GenerateRequest::with_image(image, prompts::RECOGNIZE.to_string());
        self.generate_text(&body).await
    }

    async fn verify(&self, image: &ExportedImage, target: char) -> TutorResult<Verdict> {
        let body = GenerateRequest::with_image(image, prompts::verify(target))
            .structured(prompts::verdict_schema());
        self.generate_json(&body).await
    }

    async fn stream_correction(
        &self,
        image: &ExportedImage,
        target: char,
    ) -> TutorResult<FragmentStream> {
        let body = GenerateRequest::with_image(image, prompts::correction(target));
        let url = format!("{}?alt=sse", self.method_url("streamGenerateContent"));
        let response = self.post(&url, &body).await?;
        debug!(%target, "Correction stream opened");
        Ok(Box::pin(sse_fragments(response)))
    }

    async fn generate_examples(&self, character: char) -> TutorResult<Vec<String>> {
        let body = GenerateRequest::text_only(prompts::examples(character))
            .structured(prompts::examples_schema());
        self.generate_json(&body).await
    }

    async fn generate_quiz(&self, character: char) -> TutorResult<QuizQuestion> {
        let body = GenerateRequest::text_only(prompts::quiz(character))
            .structured(prompts::quiz_schema());
        self.generate_json(&body).await
    }
}

/// Candidate text of each event in a server-sent event response body.
fn sse_fragments(response: reqwest::Response) -> impl Stream<Item = TutorResult<String>> {
    try_stream! {
        let mut decoder = SseDecoder::default();
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(TutorError::from)?;
            for data in decoder.push(&chunk) {
                if let Some(text) = decode_event(&data)? {
                    yield text;
                }
            }
        }
        if let Some(data) = decoder.finish() {
            if let Some(text) = decode_event(&data)? {
                yield text;
            }
        }
    }
}

/// Decode one SSE `data` payload into its candidate text, skipping empties.
fn decode_event(data: &str) -> TutorResult<Option<String>> {
    if data.trim() == "[DONE]" {
        return Ok(None);
    }
    let parsed: GenerateResponse = serde_json::from_str(data).map_err(TutorError::from)?;
    Ok(parsed.text().filter(|t| !t.is_empty()))
}

/// Some models wrap JSON answers in a markdown fence despite the MIME type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    fn with_image(image: &ExportedImage, text: String) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type(),
                            data: image.to_base64(),
                        },
                    },
                    Part::Text { text },
                ],
            }],
            generation_config: None,
        }
    }

    fn text_only(text: String) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::Text { text }],
            }],
            generation_config: None,
        }
    }

    fn structured(mut self, schema: Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: "application/json",
            response_schema: schema,
        });
        self
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

// ============================================================================
// Server-sent events
// ============================================================================

/// Incremental `text/event-stream` decoder yielding each event's `data`.
///
/// Buffers raw bytes so multi-byte characters split across chunks survive.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed a chunk; returns the data of every event it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some((end, sep_len)) = find_event_end(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + sep_len).collect();
            if let Some(data) = event_data(&raw[..end]) {
                events.push(data);
            }
        }
        events
    }

    /// Data of a trailing event not followed by a blank line.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        event_data(&raw)
    }
}

fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn event_data(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

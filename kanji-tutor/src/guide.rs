//! Stroke-order guide loading.
//!
//! Guide geometry is best effort: any failure to fetch or parse a document
//! yields `None` and the surface falls back to the plain glyph.

use async_trait::async_trait;
use kanji_core::{stroke_key, StrokeGeometry};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::config::TutorConfig;
use crate::error::{TutorError, TutorResult};

/// A source of stroke geometry.
#[async_trait]
pub trait StrokeSource: Send + Sync {
    /// Geometry for `character`, or `None` if unavailable for any reason.
    async fn fetch(&self, character: char) -> Option<StrokeGeometry>;
}

/// Fetches KanjiVG documents over HTTP.
#[derive(Debug, Clone)]
pub struct KanjiVgSource {
    http: Client,
    base_url: Url,
}

impl KanjiVgSource {
    /// Source at the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::InvalidUrl`] for a malformed base URL and
    /// [`TutorError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &TutorConfig) -> TutorResult<Self> {
        Self::with_client(config.http_client()?, &config.guide_base_url)
    }

    /// Source reusing an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::InvalidUrl`] for a malformed base URL.
    pub fn with_client(http: Client, base_url: &str) -> TutorResult<Self> {
        let base_url = Url::parse(base_url.trim().trim_end_matches('/'))
            .map_err(|e| TutorError::InvalidUrl(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    /// Document URL for `character`.
    #[must_use]
    pub fn document_url(&self, character: char) -> String {
        format!(
            "{}/{}.svg",
            self.base_url.as_str().trim_end_matches('/'),
            stroke_key(character)
        )
    }

    async fn fetch_document(&self, url: &str) -> TutorResult<Option<String>> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TutorError::HttpStatus { status, body });
        }
        Ok(Some(response.text().await?))
    }
}

#[async_trait]
impl StrokeSource for KanjiVgSource {
    async fn fetch(&self, character: char) -> Option<StrokeGeometry> {
        let url = self.document_url(character);
        let document = match self.fetch_document(&url).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!(%character, %url, "No stroke document");
                return None;
            }
            Err(e) => {
                warn!(%character, error = %e, "Stroke document fetch failed");
                return None;
            }
        };

        match StrokeGeometry::from_kanjivg(&document) {
            Ok(geometry) if geometry.is_empty() => {
                debug!(%character, "Stroke document has no strokes");
                None
            }
            Ok(geometry) => {
                debug!(%character, strokes = geometry.len(), "Loaded stroke guide");
                Some(geometry)
            }
            Err(e) => {
                warn!(%character, error = %e, "Stroke document parse failed");
                None
            }
        }
    }
}

/// A source with no guides; every character uses the fallback glyph.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGuides;

#[async_trait]
impl StrokeSource for NoGuides {
    async fn fetch(&self, _character: char) -> Option<StrokeGeometry> {
        None
    }
}

//! Tutor configuration.
//!
//! Read from the environment with [`TutorConfig::from_env`]; every value has
//! a default except the API key.

use std::fmt;
use std::time::Duration;

use crate::error::{TutorError, TutorResult};

/// Default generative model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default generative API base.
pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default KanjiVG document base.
pub const DEFAULT_GUIDE_URL: &str = "https://cdn.jsdelivr.net/gh/KanjiVG/kanjivg@master/kanji";
/// Inactivity before an automatic check.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_500;
/// Settle time for container resize notifications.
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 100;
/// HTTP client timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Tutor settings.
#[derive(Clone)]
pub struct TutorConfig {
    /// API key for the generative service.
    pub api_key: Option<String>,
    /// Model name, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// API base URL, without the `/models/...` suffix.
    pub api_endpoint: String,
    /// Base URL of KanjiVG documents.
    pub guide_base_url: String,
    /// Inactivity before an automatic check in practice mode.
    pub debounce: Duration,
    /// Settle time for resize notifications.
    pub resize_debounce: Duration,
    /// HTTP timeout for every request.
    pub timeout: Duration,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            guide_base_url: DEFAULT_GUIDE_URL.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            resize_debounce: Duration::from_millis(DEFAULT_RESIZE_DEBOUNCE_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl TutorConfig {
    /// Read settings from the environment.
    ///
    /// `GEMINI_API_KEY`, `KANJI_MODEL`, `KANJI_API_ENDPOINT`,
    /// `KANJI_GUIDE_URL`, `KANJI_DEBOUNCE_MS`, `KANJI_TIMEOUT_MS`. Unset,
    /// blank or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_string("GEMINI_API_KEY"),
            model: env_string("KANJI_MODEL").unwrap_or(defaults.model),
            api_endpoint: env_string("KANJI_API_ENDPOINT").unwrap_or(defaults.api_endpoint),
            guide_base_url: env_string("KANJI_GUIDE_URL").unwrap_or(defaults.guide_base_url),
            debounce: env_u64("KANJI_DEBOUNCE_MS").map_or(defaults.debounce, Duration::from_millis),
            resize_debounce: defaults.resize_debounce,
            timeout: env_u64("KANJI_TIMEOUT_MS").map_or(defaults.timeout, Duration::from_millis),
        }
    }

    /// True if an API key is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Shared HTTP client honouring the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::Http`] if the client cannot be built.
    pub fn http_client(&self) -> TutorResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("kanji-pad/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TutorError::from)
    }
}

impl fmt::Debug for TutorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TutorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_endpoint", &self.api_endpoint)
            .field("guide_base_url", &self.guide_base_url)
            .field("debounce", &self.debounce)
            .field("resize_debounce", &self.resize_debounce)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TutorConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.debounce, Duration::from_millis(1500));
        assert!(!config.is_configured());
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let config = TutorConfig {
            api_key: Some("   ".to_string()),
            ..TutorConfig::default()
        };
        assert!(!config.is_configured());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = TutorConfig {
            api_key: Some("secret-key".to_string()),
            ..TutorConfig::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("<redacted>"));
    }
}

//! Environment-driven configuration.
//!
//! [`StoryConfig::from_env`] reads an optional `.env` file (via `dotenvy`)
//! and then the process environment. A missing `GEMINI_API_KEY` is not an
//! error here: it produces a config whose context will be *unavailable*,
//! so every request is served from fallback content.

use crate::backend::gemini::DEFAULT_BASE_URL;
use crate::error::{Result, StoryError};
use crate::retry::JitterStrategy;
use std::time::Duration;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_VISION_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Settings for the generation backend and pipeline pacing.
#[derive(Clone)]
pub struct StoryConfig {
    /// Gemini API key. `None` leaves the backend uninitialized.
    pub api_key: Option<String>,
    /// API host.
    pub base_url: String,
    /// Model used for the narrative.
    pub text_model: String,
    /// Model used for photo analysis.
    pub vision_model: String,
    /// Model used for illustrations.
    pub image_model: String,
    /// Attempts per backend call.
    pub retry_attempts: u32,
    /// Base backoff delay.
    pub retry_base_delay: Duration,
    /// Jitter on top of the backoff delay.
    pub retry_jitter: JitterStrategy,
    /// Pause after each illustration.
    pub image_pacing: Duration,
    /// Per-call HTTP deadline.
    pub request_timeout: Duration,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            retry_attempts: 3,
            retry_base_delay: Duration::from_secs(2),
            retry_jitter: JitterStrategy::None,
            image_pacing: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl std::fmt::Debug for StoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryConfig")
            .field("has_api_key", &self.api_key.is_some())
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("image_model", &self.image_model)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("retry_jitter", &self.retry_jitter)
            .field("image_pacing", &self.image_pacing)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl StoryConfig {
    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            api_key: get("GEMINI_API_KEY"),
            base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            text_model: get("GEMINI_TEXT_MODEL").unwrap_or(defaults.text_model),
            vision_model: get("GEMINI_VISION_MODEL").unwrap_or(defaults.vision_model),
            image_model: get("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            retry_attempts: match get("STORY_RETRY_ATTEMPTS") {
                Some(v) => parse_number("STORY_RETRY_ATTEMPTS", &v)?,
                None => defaults.retry_attempts,
            },
            retry_base_delay: match get("STORY_RETRY_BASE_DELAY_SECS") {
                Some(v) => Duration::from_secs(parse_number("STORY_RETRY_BASE_DELAY_SECS", &v)?),
                None => defaults.retry_base_delay,
            },
            retry_jitter: match get("STORY_RETRY_JITTER") {
                Some(v) => JitterStrategy::parse(&v).ok_or_else(|| {
                    StoryError::InvalidConfig(format!(
                        "STORY_RETRY_JITTER must be none, full, or equal, got '{}'",
                        v
                    ))
                })?,
                None => defaults.retry_jitter,
            },
            image_pacing: match get("STORY_IMAGE_PACING_MS") {
                Some(v) => Duration::from_millis(parse_number("STORY_IMAGE_PACING_MS", &v)?),
                None => defaults.image_pacing,
            },
            request_timeout: match get("STORY_REQUEST_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse_number("STORY_REQUEST_TIMEOUT_SECS", &v)?),
                None => defaults.request_timeout,
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| StoryError::InvalidConfig(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = StoryConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_base_delay, Duration::from_secs(2));
        assert_eq!(config.retry_jitter, JitterStrategy::None);
        assert_eq!(config.image_pacing, Duration::from_secs(1));
    }

    #[test]
    fn test_overrides() {
        let config = StoryConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "AIza-test"),
            ("GEMINI_IMAGE_MODEL", "imagen-x"),
            ("STORY_RETRY_ATTEMPTS", "5"),
            ("STORY_IMAGE_PACING_MS", "250"),
            ("STORY_RETRY_JITTER", "equal"),
        ]))
        .unwrap();
        assert_eq!(config.retry_jitter, JitterStrategy::Equal);
        assert_eq!(config.api_key.as_deref(), Some("AIza-test"));
        assert_eq!(config.image_model, "imagen-x");
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.image_pacing, Duration::from_millis(250));
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = StoryConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_bad_number_rejected() {
        let err = StoryConfig::from_lookup(lookup(&[("STORY_RETRY_ATTEMPTS", "three")])).unwrap_err();
        assert!(matches!(err, StoryError::InvalidConfig(_)));
    }

    #[test]
    fn test_bad_jitter_rejected() {
        let err = StoryConfig::from_lookup(lookup(&[("STORY_RETRY_JITTER", "lots")])).unwrap_err();
        assert!(matches!(err, StoryError::InvalidConfig(_)));
    }

    #[test]
    fn test_debug_hides_key() {
        let config = StoryConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "AIza-secret")])).unwrap();
        let out = format!("{:?}", config);
        assert!(!out.contains("AIza-secret"));
        assert!(out.contains("has_api_key: true"));
    }
}

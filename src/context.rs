//! Generation context shared across story requests.
//!
//! [`StoryCtx`] is the capability object every pipeline stage takes as an
//! explicit dependency: the backend (or its absence), model identifiers,
//! the retry policy, and illustration pacing. It is constructed once at
//! process start and shared read-only across concurrent requests.

use crate::backend::{GeminiBackend, GenerationBackend};
use crate::config::{StoryConfig, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL};
use crate::error::{Result, StoryError};
use crate::retry::RetryPolicy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Shared execution context for story generation.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use storybook_pipeline::{MockBackend, MockReply, StoryCtx};
///
/// let ctx = StoryCtx::builder()
///     .backend(Arc::new(MockBackend::fixed(MockReply::text("hi"))))
///     .build();
/// assert!(ctx.is_available());
///
/// assert!(!StoryCtx::unavailable().is_available());
/// ```
pub struct StoryCtx {
    /// Generation backend. `None` means initialization failed at startup.
    backend: Option<Arc<dyn GenerationBackend>>,
    /// Model used for the narrative.
    pub text_model: String,
    /// Model used for photo analysis.
    pub vision_model: String,
    /// Model used for illustrations.
    pub image_model: String,
    /// Retry policy applied to every backend call.
    pub retry: RetryPolicy,
    /// Pause after each illustration, regardless of outcome.
    pub image_pacing: Duration,
}

impl StoryCtx {
    /// Create a new builder.
    pub fn builder() -> StoryCtxBuilder {
        StoryCtxBuilder {
            backend: None,
            text_model: None,
            vision_model: None,
            image_model: None,
            retry: None,
            image_pacing: None,
        }
    }

    /// A context with no backend; every request takes the fallback path.
    pub fn unavailable() -> Self {
        Self::builder().build()
    }

    /// Build from configuration. Never fails: problems leave the backend
    /// uninitialized and are logged.
    pub fn from_config(config: &StoryConfig) -> Self {
        let builder = Self::builder()
            .text_model(config.text_model.clone())
            .vision_model(config.vision_model.clone())
            .image_model(config.image_model.clone())
            .retry(
                RetryPolicy::new(config.retry_attempts, config.retry_base_delay)
                    .with_jitter(config.retry_jitter),
            )
            .image_pacing(config.image_pacing);

        let Some(api_key) = config.api_key.as_deref() else {
            error!("GEMINI_API_KEY is not set; serving fallback stories only");
            return builder.build();
        };

        match Client::builder().timeout(config.request_timeout).build() {
            Ok(client) => {
                let backend = GeminiBackend::new(client, api_key).with_base_url(config.base_url.clone());
                info!(base_url = %config.base_url, "Gemini backend configured");
                builder.backend(Arc::new(backend)).build()
            }
            Err(e) => {
                error!(error = %e, "failed to build HTTP client; serving fallback stories only");
                builder.build()
            }
        }
    }

    /// Whether the backend was successfully initialized.
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// The backend, or [`StoryError::Unavailable`].
    pub fn backend(&self) -> Result<&Arc<dyn GenerationBackend>> {
        self.backend.as_ref().ok_or(StoryError::Unavailable)
    }
}

impl std::fmt::Debug for StoryCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryCtx")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("image_model", &self.image_model)
            .field("retry", &self.retry)
            .field("image_pacing", &self.image_pacing)
            .finish()
    }
}

/// Builder for [`StoryCtx`].
pub struct StoryCtxBuilder {
    backend: Option<Arc<dyn GenerationBackend>>,
    text_model: Option<String>,
    vision_model: Option<String>,
    image_model: Option<String>,
    retry: Option<RetryPolicy>,
    image_pacing: Option<Duration>,
}

impl StoryCtxBuilder {
    /// Set the generation backend. Without one the context is unavailable.
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the narrative model.
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Set the photo-analysis model.
    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    /// Set the illustration model.
    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Set the retry policy. Default: [`RetryPolicy::standard()`].
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Set the pause after each illustration. Default: 1 second.
    pub fn image_pacing(mut self, pacing: Duration) -> Self {
        self.image_pacing = Some(pacing);
        self
    }

    /// Build the context.
    pub fn build(self) -> StoryCtx {
        StoryCtx {
            backend: self.backend,
            text_model: self.text_model.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            vision_model: self.vision_model.unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            image_model: self.image_model.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            retry: self.retry.unwrap_or_default(),
            image_pacing: self.image_pacing.unwrap_or(Duration::from_secs(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::retry::JitterStrategy;

    #[test]
    fn test_unavailable_backend_errors() {
        let ctx = StoryCtx::unavailable();
        assert!(!ctx.is_available());
        assert!(matches!(ctx.backend(), Err(StoryError::Unavailable)));
    }

    #[test]
    fn test_builder_defaults() {
        let ctx = StoryCtx::builder()
            .backend(Arc::new(MockBackend::fixed(MockReply::Empty)))
            .build();
        assert!(ctx.is_available());
        assert_eq!(ctx.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(ctx.retry.max_attempts, 3);
        assert_eq!(ctx.image_pacing, Duration::from_secs(1));
    }

    #[test]
    fn test_from_config_without_key_is_unavailable() {
        let ctx = StoryCtx::from_config(&StoryConfig::default());
        assert!(!ctx.is_available());
    }

    #[test]
    fn test_from_config_with_key() {
        let config = StoryConfig {
            api_key: Some("AIza-test".into()),
            retry_attempts: 4,
            retry_jitter: JitterStrategy::Full,
            ..StoryConfig::default()
        };
        let ctx = StoryCtx::from_config(&config);
        assert!(ctx.is_available());
        assert_eq!(ctx.retry.max_attempts, 4);
        assert_eq!(ctx.retry.jitter, JitterStrategy::Full);
        assert!(format!("{:?}", ctx).contains("gemini"));
    }
}

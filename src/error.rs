use std::time::Duration;
use thiserror::Error;

/// Errors produced by the story pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum StoryError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// The status code is part of the rendered message, which is what the
    /// quota classifier in [`retry::classify`](crate::retry::classify) inspects.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The uploaded photo bytes are not a recognizable image.
    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    /// The backend rejected a call because of rate or usage limits.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Every attempt failed without a quota signature.
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        /// Name of the retried operation (for logs).
        operation: String,
        /// Number of attempts made.
        attempts: u32,
        /// Rendered text of the final error.
        last_error: String,
    },

    /// The model answered, but not in the required shape.
    #[error("Malformed generation output: {0}")]
    MalformedOutput(String),

    /// An image call returned no inline binary payload.
    #[error("Response contained no image data")]
    NoImageData,

    /// The narrative generator gave up.
    #[error("Story generation failed: {0}")]
    GenerationFailed(String),

    /// The generation backend was never initialized.
    #[error("Generation backend is not initialized")]
    Unavailable,

    /// Invalid configuration detected at load time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A stored story lookup found nothing.
    #[error("Story not found: {0}")]
    NotFound(String),

    /// The persistence collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StoryError>;

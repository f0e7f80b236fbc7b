//! Backend trait and normalized request/response types.
//!
//! The [`GenerationBackend`] trait abstracts over generative model providers,
//! translating between the normalized [`GenerateRequest`]/[`GenerateResponse`]
//! types and provider-specific HTTP APIs. Built-in implementations:
//! [`GeminiBackend`], [`MockBackend`].
//!
//! ## Architecture
//!
//! ```text
//! photo / narrative / illustration
//!            │
//!            ▼
//!   GenerateRequest ──► GenerationBackend::generate() ──► GenerateResponse
//!                                │
//!                     ┌──────────┴──────────┐
//!                GeminiBackend          MockBackend
//!          models/{m}:generateContent   scripted replies
//! ```

pub mod gemini;
pub mod mock;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply};

use crate::error::Result;
use async_trait::async_trait;

/// One piece of request content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Plain text.
    Text(String),
    /// Binary payload (e.g. the uploaded photo).
    InlineData {
        /// MIME type, e.g. `"image/png"`.
        mime_type: String,
        /// Raw bytes; encoded by the backend as needed.
        data: Vec<u8>,
    },
}

impl Part {
    /// Shorthand for [`Part::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }
}

/// Output modality a request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    /// Text output.
    Text,
    /// Image output.
    Image,
}

impl Modality {
    /// Wire name used by the Gemini API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Image => "IMAGE",
        }
    }
}

/// A normalized generation request, provider-agnostic.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Model identifier (e.g. `"gemini-1.5-flash"`).
    pub model: String,

    /// Ordered content parts: text, optionally combined with images.
    pub parts: Vec<Part>,

    /// Requested response modalities. Empty means provider default (text).
    pub response_modalities: Vec<Modality>,
}

impl GenerateRequest {
    /// A text-only request.
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            parts: vec![Part::text(prompt)],
            response_modalities: Vec::new(),
        }
    }

    /// Append a content part.
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Set the requested response modalities.
    pub fn with_modalities(mut self, modalities: &[Modality]) -> Self {
        self.response_modalities = modalities.to_vec();
        self
    }

    /// Concatenated text parts, for logging and test doubles.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One piece of response content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// Generated text.
    Text(String),
    /// Decoded binary payload.
    InlineData {
        /// MIME type reported by the provider, if any.
        mime_type: Option<String>,
        /// Decoded bytes.
        data: Vec<u8>,
    },
}

/// A normalized generation response.
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    /// Content parts of the first candidate, in provider order.
    pub parts: Vec<ResponsePart>,
}

impl GenerateResponse {
    /// Response holding a single text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![ResponsePart::Text(text.into())],
        }
    }

    /// Concatenated text parts, or `None` if there is no non-empty text.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .parts
            .iter()
            .filter_map(|p| match p {
                ResponsePart::Text(t) => Some(t.as_str()),
                ResponsePart::InlineData { .. } => None,
            })
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// The first inline binary payload, in part order.
    pub fn first_inline_data(&self) -> Option<&[u8]> {
        self.parts.iter().find_map(|p| match p {
            ResponsePart::InlineData { data, .. } => Some(data.as_slice()),
            ResponsePart::Text(_) => None,
        })
    }
}

/// Abstraction over generative model providers.
///
/// Implementors translate the normalized request into the provider's HTTP
/// API. Failures surface as [`StoryError`](crate::StoryError)s whose rendered
/// text keeps the provider's status code and message, which is what quota
/// detection in [`retry::classify`](crate::retry::classify) relies on.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn GenerationBackend>`.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Execute a single generation call.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

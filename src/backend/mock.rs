//! Mock backend for testing without a live model.
//!
//! [`MockBackend`] returns pre-configured replies in order, allowing
//! deterministic tests of every pipeline stage, including failure paths.
//!
//! # Example
//!
//! ```
//! use storybook_pipeline::backend::{MockBackend, MockReply};
//!
//! let mock = MockBackend::new(vec![
//!     MockReply::text("A cheerful child with red boots."),
//!     MockReply::error("HTTP 429: quota exhausted"),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GenerateRequest, GenerateResponse, GenerationBackend, ResponsePart};
use crate::error::Result;
use crate::StoryError;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A response with a single text part.
    Text(String),
    /// A response with a short text part followed by an inline image.
    Image(Vec<u8>),
    /// A response with no parts at all.
    Empty,
    /// A failed call; the message becomes [`StoryError::Other`].
    Error(String),
}

impl MockReply {
    /// Shorthand for [`MockReply::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    /// Shorthand for [`MockReply::Error`].
    pub fn error(message: impl Into<String>) -> Self {
        MockReply::Error(message.into())
    }
}

/// A test backend that returns scripted replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
/// Every request is recorded for later inspection.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockBackend {
    /// Create a mock backend with the given scripted replies.
    ///
    /// Replies are returned in order. When exhausted, cycles from the beginning.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn fixed(reply: MockReply) -> Self {
        Self::new(vec![reply])
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::SeqCst) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }

        match self.next_reply() {
            MockReply::Text(text) => Ok(GenerateResponse::from_text(text)),
            MockReply::Image(data) => Ok(GenerateResponse {
                parts: vec![
                    ResponsePart::Text("Here is your illustration.".into()),
                    ResponsePart::InlineData {
                        mime_type: Some("image/png".into()),
                        data,
                    },
                ],
            }),
            MockReply::Empty => Ok(GenerateResponse::default()),
            MockReply::Error(message) => Err(StoryError::Other(message)),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

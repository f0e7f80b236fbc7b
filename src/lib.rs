//! # Storybook Pipeline
//!
//! Personalized illustrated children's stories from a child's name, a photo,
//! and a few thematic preferences.
//!
//! The crate is the generation core: photo analysis, structured narrative
//! generation, per-segment illustration, and deterministic fallback content.
//! HTTP routing and request validation belong to the host service; storage
//! is reached through the [`StoryStore`] trait.
//!
//! ## Core Concepts
//!
//! - **[`StoryCtx`]**: capability object built once at startup: backend
//!   (or its absence), models, [`RetryPolicy`], illustration pacing.
//! - **[`GenerationBackend`]**: object-safe provider trait.
//!   [`GeminiBackend`] talks to the Gemini REST API; [`MockBackend`] replays
//!   scripted replies for tests.
//! - **[`process_story_request`]**: the end-to-end operation. Never fails:
//!   quota errors, exhausted retries, and an uninitialized backend all end
//!   in [`fallback`] content.
//! - **[`StoryDocument`]**: the result; serializes with base64 images and
//!   `null` for illustrations that could not be produced.
//!
//! ## Pipeline
//!
//! ```text
//! photo ──► photo::analyze_photo ──► narrative::generate_story ──► illustration::generate_illustrations
//!                 │                          │                               │
//!            default text            quota ► fallback                 None per failed prompt
//!                                    other ► GenerationFailed ► fallback (in pipeline)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use storybook_pipeline::{
//!     generate_and_store, MemoryStore, StoryConfig, StoryCtx, StoryRequest, StoryStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = StoryCtx::from_config(&StoryConfig::from_env()?);
//!     let store: Arc<dyn StoryStore> = Arc::new(MemoryStore::new());
//!
//!     let request = StoryRequest::new("Mia", "space").with_length("short");
//!     let photo = std::fs::read("mia.jpg")?;
//!
//!     let summary = generate_and_store(&ctx, &store, &request, &photo).await;
//!     println!("{}: {}", summary.id, summary.title);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod illustration;
pub mod narrative;
pub mod parsing;
pub mod photo;
pub mod pipeline;
pub mod retry;
pub mod store;
pub mod story;
pub mod types;

pub use backend::{GeminiBackend, GenerateRequest, GenerateResponse, GenerationBackend, MockBackend, MockReply};
pub use config::StoryConfig;
pub use context::{StoryCtx, StoryCtxBuilder};
pub use error::{Result, StoryError};
pub use fallback::create_fallback_story;
pub use illustration::generate_illustrations;
pub use narrative::generate_story;
pub use photo::{analyze_photo, decode_photo, DEFAULT_DESCRIPTION};
pub use pipeline::{generate_and_store, process_story_request};
pub use retry::{classify, ErrorKind, JitterStrategy, RetryPolicy};
pub use store::{persist_in_background, MemoryStore, StoryRecord, StoryStore, StorySummary};
pub use story::{StoryDocument, StoryDraft};
pub use types::{sentence_count, StoryRequest, Theme};

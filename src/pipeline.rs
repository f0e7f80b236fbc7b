//! End-to-end story orchestration.
//!
//! ```text
//! process_story_request
//!   ├─ backend unavailable ──────────────────────────► fallback (default description)
//!   └─ analyze_photo (total) ─► generate_story ─┬─ Ok ─► document (+ illustrations)
//!                                               └─ Err ► fallback (obtained description)
//! ```
//!
//! [`process_story_request`] is the single point where every failure is
//! absorbed: it always returns a usable [`StoryDocument`]. Each call is an
//! independent future, so a server runs one task per request and backoff
//! sleeps never block unrelated requests.

use crate::context::StoryCtx;
use crate::fallback::create_fallback_story;
use crate::narrative::generate_story;
use crate::photo::{analyze_photo, DEFAULT_DESCRIPTION};
use crate::store::{persist_in_background, StoryRecord, StoryStore, StorySummary};
use crate::story::StoryDocument;
use crate::types::StoryRequest;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Produce a story for `request`, personalized from `photo` when possible.
///
/// Never fails. Worst case is a templated story with no illustrations.
///
/// # Example
///
/// ```
/// use storybook_pipeline::{process_story_request, StoryCtx, StoryRequest};
///
/// # tokio_test::block_on(async {
/// let ctx = StoryCtx::unavailable();
/// let request = StoryRequest::new("Mia", "space").with_length("short");
/// let doc = process_story_request(&ctx, &request, &[]).await;
/// assert_eq!(doc.title, "Mia's Cosmic Journey");
/// assert_eq!(doc.story.len(), 6);
/// # });
/// ```
#[instrument(skip_all, fields(kid_name = %request.kid_name, theme = %request.theme, story_length = %request.story_length))]
pub async fn process_story_request(
    ctx: &StoryCtx,
    request: &StoryRequest,
    photo: &[u8],
) -> StoryDocument {
    if !ctx.is_available() {
        warn!("generation backend not initialized, using fallback story");
        return create_fallback_story(request, DEFAULT_DESCRIPTION);
    }

    let description = analyze_photo(ctx, photo).await;

    match generate_story(ctx, request, &description).await {
        Ok(document) => {
            info!(
                title = %document.title,
                illustrated = document.illustrated_count(),
                "story ready"
            );
            document
        }
        Err(e) => {
            error!(error = %e, "story generation failed, using fallback story");
            create_fallback_story(request, &description)
        }
    }
}

/// Generate a story, hand it to `store` in the background, and return the
/// client-facing summary without waiting for the write.
pub async fn generate_and_store(
    ctx: &StoryCtx,
    store: &Arc<dyn StoryStore>,
    request: &StoryRequest,
    photo: &[u8],
) -> StorySummary {
    let document = process_story_request(ctx, request, photo).await;
    let record = StoryRecord::new(request, &document);
    let summary = StorySummary::from(&record);
    persist_in_background(Arc::clone(store), record);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::photo::sample_png;
    use crate::retry::RetryPolicy;
    use crate::store::MemoryStore;
    use std::time::Duration;


    const STORY_JSON: &str = r#"{
        "title": "Mia Among the Stars",
        "moral": "Wonder makes us brave.",
        "story": ["a", "b", "c", "d", "e", "f"],
        "imagePrompts": ["p1", "p2", "p3"]
    }"#;

    fn ctx_with(mock: Arc<MockBackend>) -> StoryCtx {
        StoryCtx::builder()
            .backend(mock)
            .retry(RetryPolicy::new(3, Duration::from_millis(1)))
            .image_pacing(Duration::ZERO)
            .build()
    }

    fn request() -> StoryRequest {
        StoryRequest::new("Mia", "space").with_length("short")
    }

    #[tokio::test]
    async fn test_unavailable_backend_scenario() {
        let doc = process_story_request(&StoryCtx::unavailable(), &request(), &sample_png()).await;
        assert_eq!(doc.title, "Mia's Cosmic Journey");
        assert_eq!(doc.story.len(), 6);
        assert_eq!(doc.image_prompts.len(), 3);
        assert_eq!(doc.images, vec![None, None, None]);
    }

    #[tokio::test]
    async fn test_full_live_path() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::text("A girl with two puffy pigtails and a star t-shirt."),
            MockReply::text(format!("```json\n{}\n```", STORY_JSON)),
            MockReply::Image(vec![1]),
            MockReply::error("HTTP 429: quota"),
            MockReply::Image(vec![3]),
        ]));
        let ctx = ctx_with(mock.clone());

        let doc = process_story_request(&ctx, &request(), &sample_png()).await;

        assert_eq!(doc.title, "Mia Among the Stars");
        assert_eq!(doc.images, vec![Some(vec![1]), None, Some(vec![3])]);

        let requests = mock.requests();
        assert_eq!(requests.len(), 5);
        assert!(requests[1]
            .prompt_text()
            .contains("Character description: A girl with two puffy pigtails"));
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back_with_description() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::text("A boy with glasses."),
            MockReply::text("no json here"),
            MockReply::text("still no json"),
            MockReply::text("nope"),
        ]));
        let ctx = ctx_with(mock.clone());

        let doc = process_story_request(&ctx, &request(), &sample_png()).await;

        assert_eq!(doc.title, "Mia's Cosmic Journey");
        assert!(doc.images.iter().all(Option::is_none));
        assert_eq!(mock.calls(), 4);
    }

    #[tokio::test]
    async fn test_quota_everywhere_still_returns_story() {
        let mock = Arc::new(MockBackend::fixed(MockReply::error("429 Too Many Requests")));
        let ctx = ctx_with(mock.clone());

        let doc = process_story_request(&ctx, &request().with_length("long"), &sample_png()).await;

        assert_eq!(doc.story.len(), 12);
        assert_eq!(doc.image_prompts.len(), 6);
        // One photo call, one story call; no illustration calls on the fallback path.
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let ctx = Arc::new(StoryCtx::unavailable());
        let mut handles = Vec::new();
        for (name, length) in [("Ana", "short"), ("Ben", "long"), ("Cy", "medium")] {
            let ctx = Arc::clone(&ctx);
            handles.push(tokio::spawn(async move {
                let request = StoryRequest::new(name, "ocean").with_length(length);
                process_story_request(&ctx, &request, &[]).await
            }));
        }

        let mut lengths = Vec::new();
        for handle in handles {
            lengths.push(handle.await.unwrap().story.len());
        }
        assert_eq!(lengths, vec![6, 12, 8]);
    }

    #[tokio::test]
    async fn test_generate_and_store_persists_in_background() {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn StoryStore> = store.clone();

        let summary =
            generate_and_store(&StoryCtx::unavailable(), &dyn_store, &request(), &sample_png()).await;
        assert_eq!(summary.title, "Mia's Cosmic Journey");

        let mut stored = None;
        for _ in 0..100 {
            if let Ok(record) = store.get(summary.id).await {
                stored = Some(record);
                break;
            }
            tokio::task::yield_now().await;
        }
        let stored = stored.expect("story was not persisted");
        assert_eq!(stored.kid_name, "Mia");
        assert_eq!(stored.images, vec![None, None, None]);
    }
}

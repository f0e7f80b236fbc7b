//! Example: generate one story from a photo on disk.
//!
//! Run with: `cargo run --example generate_story -- <photo> <name> [theme] [length]`
//!
//! Without `GEMINI_API_KEY` the fallback story is printed.

use std::sync::Arc;

use anyhow::{Context, Result};
use storybook_pipeline::{
    generate_and_store, MemoryStore, StoryConfig, StoryCtx, StoryRequest, StoryStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storybook_pipeline=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let photo_path = args
        .next()
        .context("usage: generate_story <photo> <name> [theme] [length]")?;
    let name = args.next().context("missing child name")?;
    let theme = args.next().unwrap_or_else(|| "forest".to_string());
    let length = args.next().unwrap_or_else(|| "medium".to_string());

    let config = StoryConfig::from_env().context("loading configuration")?;
    let ctx = StoryCtx::from_config(&config);
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn StoryStore> = store.clone();

    let request = StoryRequest::new(name, theme).with_length(length);
    let photo = std::fs::read(&photo_path).with_context(|| format!("reading {}", photo_path))?;

    let summary = generate_and_store(&ctx, &dyn_store, &request, &photo).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    // Give the background write a moment before listing.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    for record in store.list(10, 0).await? {
        println!("stored {} at {}", record.id, record.created_at);
    }

    Ok(())
}

//! Persistence collaborator contract.
//!
//! Finished stories are stored as [`StoryRecord`]s keyed by a generated id
//! and creation timestamp. Writes happen off the request path via
//! [`persist_in_background`]: a failed write is logged and dropped.

use crate::error::{Result, StoryError};
use crate::story::StoryDocument;
use crate::types::StoryRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

/// A stored story: the request that produced it plus the transport-form document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: Uuid,
    pub kid_name: String,
    pub age_level: String,
    pub theme: String,
    pub story_type: String,
    pub story_length: String,
    pub special_ingredients: Option<String>,
    pub title: String,
    pub moral: String,
    pub story: Vec<String>,
    pub image_prompts: Vec<String>,
    /// Base64 images, `None` where illustration failed.
    pub images: Vec<Option<String>>,
    pub created_at: DateTime<Utc>,
}

impl StoryRecord {
    /// New record with a fresh v4 id, stamped now.
    pub fn new(request: &StoryRequest, document: &StoryDocument) -> Self {
        Self {
            id: Uuid::new_v4(),
            kid_name: request.kid_name.clone(),
            age_level: request.age_level.clone(),
            theme: request.theme.clone(),
            story_type: request.story_type.clone(),
            story_length: request.story_length.clone(),
            special_ingredients: request.special_ingredients.clone(),
            title: document.title.clone(),
            moral: document.moral.clone(),
            story: document.story.clone(),
            image_prompts: document.image_prompts.clone(),
            images: document.encoded_images(),
            created_at: Utc::now(),
        }
    }
}

/// What clients get back for a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: Uuid,
    pub title: String,
    pub moral: String,
    pub story: Vec<String>,
    pub images: Vec<Option<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<&StoryRecord> for StorySummary {
    fn from(record: &StoryRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            moral: record.moral.clone(),
            story: record.story.clone(),
            images: record.images.clone(),
            created_at: record.created_at,
        }
    }
}

/// Durable storage for finished stories.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Store a record.
    async fn insert(&self, record: StoryRecord) -> Result<()>;

    /// Fetch by id, or [`StoryError::NotFound`].
    async fn get(&self, id: Uuid) -> Result<StoryRecord>;

    /// Most recent first, skipping `skip` and returning at most `limit`.
    async fn list(&self, limit: usize, skip: usize) -> Result<Vec<StoryRecord>>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn insert(&self, record: StoryRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoryError::Storage(format!("duplicate story id {}", record.id)));
        }
        records.push(record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<StoryRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoryError::NotFound(id.to_string()))
    }

    async fn list(&self, limit: usize, skip: usize) -> Result<Vec<StoryRecord>> {
        // Newest insertions first so equal timestamps keep a stable order.
        let mut records: Vec<StoryRecord> = self.records.read().await.iter().rev().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records.into_iter().skip(skip).take(limit).collect())
    }
}

/// Store `record` on a background task. Failures are logged, never retried.
pub fn persist_in_background(store: Arc<dyn StoryStore>, record: StoryRecord) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = record.id;
        match store.insert(record).await {
            Ok(()) => info!(%id, "saved story"),
            Err(e) => error!(%id, error = %e, "failed to save story"),
        }
    })
}

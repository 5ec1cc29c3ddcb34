use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::dao::EmbeddingStore;
use super::models::{ImageRecord, NewImage};

/// In-memory store for tests and local runs. Scans clone the record list
/// under the read lock, so an interleaved insert is observed either fully or
/// not at all.
#[derive(Debug, Default)]
pub struct MemoryEmbeddingStore {
    records: RwLock<Vec<ImageRecord>>,
}

impl MemoryEmbeddingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmbeddingStore for MemoryEmbeddingStore {
    async fn insert(&self, image: NewImage) -> Result<Uuid> {
        let image_id = Uuid::new_v4();
        let record = ImageRecord {
            image_id,
            image_path: image.image_path,
            embedding: image.embedding,
            embedding_model: image.embedding_model,
            created_at: Utc::now(),
        };
        self.records.write().await.push(record);
        Ok(image_id)
    }

    async fn scan_all(&self) -> Result<Vec<ImageRecord>> {
        Ok(self.records.read().await.clone())
    }
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::models::{ImageRecord, NewImage};

/// Persistence contract for image embeddings: insert plus a fresh full scan
/// per call. No cursor state is retained between scans.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    async fn insert(&self, image: NewImage) -> Result<Uuid>;

    /// Every stored record, in insertion order. Each call runs a new scan;
    /// callers see either the pre- or post-insert snapshot of a concurrent
    /// ingestion, never a torn record.
    async fn scan_all(&self) -> Result<Vec<ImageRecord>>;
}

/// PostgreSQL-backed store. Embeddings are kept as `real[]` so the full
/// `f32` precision survives the round trip.
#[derive(Debug, Clone)]
pub struct PgEmbeddingStore {
    pool: PgPool,
}

impl PgEmbeddingStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmbeddingStore for PgEmbeddingStore {
    async fn insert(&self, image: NewImage) -> Result<Uuid> {
        let image_id = Uuid::new_v4();
        sqlx::query(
            r"
            INSERT INTO image_embeddings (image_id, image_path, embedding, embedding_model, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(image_id)
        .bind(&image.image_path)
        .bind(&image.embedding)
        .bind(&image.embedding_model)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed to insert image embedding")?;

        Ok(image_id)
    }

    async fn scan_all(&self) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT image_id, image_path, embedding, embedding_model, created_at
            FROM image_embeddings
            ORDER BY created_at, image_id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to scan image embeddings")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(ImageRecord {
                image_id: row
                    .try_get("image_id")
                    .context("failed to read image_id column")?,
                image_path: row
                    .try_get("image_path")
                    .context("failed to read image_path column")?,
                embedding: row
                    .try_get("embedding")
                    .context("failed to read embedding column")?,
                embedding_model: row
                    .try_get("embedding_model")
                    .context("failed to read embedding_model column")?,
                created_at: row
                    .try_get("created_at")
                    .context("failed to read created_at column")?,
            });
        }

        Ok(records)
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A stored image embedding. Created on ingestion, immutable afterwards;
/// the recommendation path never writes these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    pub image_id: Uuid,
    pub image_path: String,
    pub embedding: Vec<f32>,
    pub embedding_model: String,
    pub created_at: DateTime<Utc>,
}

/// Ingestion input; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub image_path: String,
    pub embedding: Vec<f32>,
    pub embedding_model: String,
}

use std::fmt::Write as _;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::store::ImageRecord;

/// One retrieval hit, ordered descending by similarity within a result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarImage {
    pub image_id: Uuid,
    pub image_path: String,
    pub similarity: f32,
}

/// Cosine similarity between two equal-length vectors. A zero norm on either
/// side yields 0 rather than NaN; results are clamped to [-1, 1] so float
/// rounding cannot leak outside the contract range.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Linear scan over the stored records, returning at most
/// `min(top_k, records.len())` hits sorted by non-increasing similarity.
/// Ties keep scan order (stable sort). Records whose dimensionality differs
/// from the query are skipped with a warning, not a fault.
#[must_use]
pub fn find_similar(query: &[f32], records: &[ImageRecord], top_k: usize) -> Vec<SimilarImage> {
    let mut hits: Vec<SimilarImage> = Vec::with_capacity(records.len());

    for record in records {
        if record.embedding.len() != query.len() {
            warn!(
                image_id = %record.image_id,
                stored_dim = record.embedding.len(),
                query_dim = query.len(),
                "skipping record with mismatched embedding dimension"
            );
            continue;
        }
        hits.push(SimilarImage {
            image_id: record.image_id,
            image_path: record.image_path.clone(),
            similarity: cosine_similarity(query, &record.embedding),
        });
    }

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(top_k);
    hits
}

/// Render the retrieval result as the textual context handed to mood
/// inference. Byte-deterministic for a given input; the exact shape is part
/// of the model-facing contract.
#[must_use]
pub fn retrieval_context(results: &[SimilarImage]) -> String {
    let mut context = String::from("Similar images found:\n");
    for (rank, image) in results.iter().enumerate() {
        let _ = writeln!(
            context,
            "{}. Image: {} (similarity: {:.3})",
            rank + 1,
            image.image_path,
            image.similarity
        );
    }
    context
}

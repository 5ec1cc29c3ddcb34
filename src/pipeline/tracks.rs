use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::clients::MusicCatalog;

/// Tags substituted when mood inference produced no usable tags.
pub const DEFAULT_MOOD_TAGS: [&str; 2] = ["happy", "energetic"];

/// One candidate track together with the mood tag that surfaced it.
/// Duplicate artist/title pairs under different tags are kept deliberately;
/// they are distinct mood associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackCandidate {
    pub artist: String,
    pub title: String,
    pub mood_tag: String,
    pub playcount: u64,
}

/// A per-tag lookup that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagFetchFailure {
    pub tag: String,
    pub reason: String,
}

/// Accumulated candidates plus explicit per-tag failure records, so a
/// partial fetch stays visible instead of collapsing into a silent empty
/// list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackPool {
    pub candidates: Vec<TrackCandidate>,
    pub failed_tags: Vec<TagFetchFailure>,
}

#[async_trait]
pub trait TrackStage: Send + Sync {
    /// Gather candidates across the mood tags. Never fails the pipeline: a
    /// bad tag is recorded and skipped, and the worst case is an empty pool.
    async fn fetch(&self, mood_tags: &[String], limit: usize) -> TrackPool;
}

/// Track fetch over the external tagging catalog.
pub struct CatalogTrackStage {
    catalog: Arc<dyn MusicCatalog>,
}

impl CatalogTrackStage {
    #[must_use]
    pub fn new(catalog: Arc<dyn MusicCatalog>) -> Self {
        Self { catalog }
    }
}

/// Integer-divided per-tag share of the overall limit, floored at 1 so every
/// tag stays represented even when `limit < tag_count`.
fn per_tag_budget(limit: usize, tag_count: usize) -> usize {
    (limit / tag_count.max(1)).max(1)
}

#[async_trait]
impl TrackStage for CatalogTrackStage {
    async fn fetch(&self, mood_tags: &[String], limit: usize) -> TrackPool {
        let tags: Vec<String> = if mood_tags.is_empty() {
            DEFAULT_MOOD_TAGS.iter().map(ToString::to_string).collect()
        } else {
            mood_tags.to_vec()
        };
        let budget = per_tag_budget(limit, tags.len());

        let mut pool = TrackPool::default();
        for tag in &tags {
            match self.catalog.top_tracks_for_tag(tag, budget).await {
                Ok(tracks) => {
                    debug!(tag = %tag, fetched = tracks.len(), budget, "tag fetch succeeded");
                    pool.candidates
                        .extend(tracks.into_iter().map(|track| TrackCandidate {
                            artist: track.artist,
                            title: track.title,
                            mood_tag: tag.clone(),
                            playcount: track.playcount.unwrap_or(0),
                        }));
                }
                Err(error) => {
                    warn!(tag = %tag, error = %format!("{error:#}"), "tag fetch failed, skipping tag");
                    pool.failed_tags.push(TagFetchFailure {
                        tag: tag.clone(),
                        reason: format!("{error:#}"),
                    });
                }
            }
        }
        pool
    }
}

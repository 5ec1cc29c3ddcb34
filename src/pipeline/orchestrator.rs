//! Recommendation pipeline orchestrator and builder.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::observability::metrics::Metrics;
use crate::store::EmbeddingStore;

use super::error::{PipelineError, PipelineStage};
use super::generate::GenerateStage;
use super::mood::{MoodProfile, MoodStage};
use super::similarity::{SimilarImage, find_similar, retrieval_context};
use super::tracks::{TrackCandidate, TrackStage};

/// Aggregate payload of one successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub similar_images: Vec<SimilarImage>,
    pub mood_analysis: MoodProfile,
    /// Marks a mood profile recovered from an unparseable model reply, so
    /// the degradation stays visible to the end consumer.
    pub mood_degraded: bool,
    pub music_tracks: Vec<TrackCandidate>,
    pub recommendations: String,
}

/// Sequences retrieval, mood inference, track fetch, and generation for one
/// request. Each downstream stage runs exactly once, in order; the three
/// fatal error kinds short-circuit the run. No retries here; retry policy
/// belongs to the service clients.
pub struct RecommendationPipeline {
    store: Arc<dyn EmbeddingStore>,
    mood: Arc<dyn MoodStage>,
    tracks: Arc<dyn TrackStage>,
    generate: Arc<dyn GenerateStage>,
    track_fetch_limit: usize,
    metrics: Option<Arc<Metrics>>,
}

impl RecommendationPipeline {
    #[must_use]
    pub fn builder(store: Arc<dyn EmbeddingStore>) -> PipelineBuilder {
        PipelineBuilder::new(store)
    }

    /// Run the full pipeline for one query embedding.
    ///
    /// # Errors
    /// Returns the originating [`PipelineError`] when the store, the mood
    /// model, or the generator is unavailable. Per-tag track failures and
    /// degraded mood parses are recovered and never surface here.
    pub async fn run(
        &self,
        query_embedding: &[f32],
        user_prompt: &str,
        top_k: usize,
    ) -> Result<Recommendation, PipelineError> {
        let started = Instant::now();
        let result = self.run_stages(query_embedding, user_prompt, top_k).await;

        if let Some(metrics) = &self.metrics {
            metrics
                .pipeline_duration
                .observe(started.elapsed().as_secs_f64());
            match &result {
                Ok(_) => metrics.pipeline_runs_completed.inc(),
                Err(error) => metrics
                    .pipeline_runs_failed
                    .with_label_values(&[error.stage().as_str()])
                    .inc(),
            }
        }
        result
    }

    fn observe_stage(&self, stage: PipelineStage, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics
                .stage_duration
                .with_label_values(&[stage.as_str()])
                .observe(started.elapsed().as_secs_f64());
        }
    }

    async fn run_stages(
        &self,
        query_embedding: &[f32],
        user_prompt: &str,
        top_k: usize,
    ) -> Result<Recommendation, PipelineError> {
        debug!(top_k, dim = query_embedding.len(), "pipeline started");

        let stage_started = Instant::now();
        let records = self
            .store
            .scan_all()
            .await
            .map_err(PipelineError::StoreUnavailable)?;
        let similar_images = find_similar(query_embedding, &records, top_k);
        let context = retrieval_context(&similar_images);
        self.observe_stage(PipelineStage::RetrieveImages, stage_started);
        debug!(
            scanned = records.len(),
            retrieved = similar_images.len(),
            "image retrieval complete"
        );

        let stage_started = Instant::now();
        let mood = self.mood.analyze(&context, user_prompt).await?;
        self.observe_stage(PipelineStage::InferMood, stage_started);
        if mood.degraded {
            warn!("continuing with degraded mood profile");
            if let Some(metrics) = &self.metrics {
                metrics.degraded_mood_profiles.inc();
            }
        }

        let stage_started = Instant::now();
        let pool = self
            .tracks
            .fetch(&mood.profile.music_moods, self.track_fetch_limit)
            .await;
        self.observe_stage(PipelineStage::FetchTracks, stage_started);
        for failure in &pool.failed_tags {
            warn!(tag = %failure.tag, reason = %failure.reason, "mood tag skipped during fetch");
            if let Some(metrics) = &self.metrics {
                metrics.tag_fetch_failures.inc();
            }
        }
        debug!(
            candidates = pool.candidates.len(),
            failed_tags = pool.failed_tags.len(),
            "track fetch complete"
        );

        let stage_started = Instant::now();
        let recommendations = self
            .generate
            .generate(&mood.profile, &pool.candidates)
            .await?;
        self.observe_stage(PipelineStage::Generate, stage_started);

        debug!("pipeline completed");
        Ok(Recommendation {
            similar_images,
            mood_analysis: mood.profile,
            mood_degraded: mood.degraded,
            music_tracks: pool.candidates,
            recommendations,
        })
    }
}

/// Builder for [`RecommendationPipeline`].
pub struct PipelineBuilder {
    store: Arc<dyn EmbeddingStore>,
    mood: Option<Arc<dyn MoodStage>>,
    tracks: Option<Arc<dyn TrackStage>>,
    generate: Option<Arc<dyn GenerateStage>>,
    track_fetch_limit: usize,
    metrics: Option<Arc<Metrics>>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(store: Arc<dyn EmbeddingStore>) -> Self {
        Self {
            store,
            mood: None,
            tracks: None,
            generate: None,
            track_fetch_limit: 20,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_mood_stage(mut self, stage: Arc<dyn MoodStage>) -> Self {
        self.mood = Some(stage);
        self
    }

    #[must_use]
    pub fn with_track_stage(mut self, stage: Arc<dyn TrackStage>) -> Self {
        self.tracks = Some(stage);
        self
    }

    #[must_use]
    pub fn with_generate_stage(mut self, stage: Arc<dyn GenerateStage>) -> Self {
        self.generate = Some(stage);
        self
    }

    #[must_use]
    pub fn with_track_fetch_limit(mut self, limit: usize) -> Self {
        self.track_fetch_limit = limit;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// # Panics
    /// Panics when a stage was not configured; pipeline construction is a
    /// startup-time concern.
    #[must_use]
    pub fn build(self) -> RecommendationPipeline {
        RecommendationPipeline {
            store: self.store,
            mood: self
                .mood
                .unwrap_or_else(|| panic!("mood stage must be configured before build")),
            tracks: self
                .tracks
                .unwrap_or_else(|| panic!("track stage must be configured before build")),
            generate: self
                .generate
                .unwrap_or_else(|| panic!("generate stage must be configured before build")),
            track_fetch_limit: self.track_fetch_limit,
            metrics: self.metrics,
        }
    }
}

pub mod error;
pub mod generate;
pub mod mood;
pub mod orchestrator;
pub mod similarity;
pub mod tracks;

pub use error::{PipelineError, PipelineStage};
pub use generate::{GenerateStage, LlmGenerateStage};
pub use mood::{LlmMoodStage, MoodOutcome, MoodProfile, MoodStage, UNPARSED_MOOD};
pub use orchestrator::{PipelineBuilder, Recommendation, RecommendationPipeline};
pub use similarity::{SimilarImage, cosine_similarity, find_similar, retrieval_context};
pub use tracks::{
    CatalogTrackStage, DEFAULT_MOOD_TAGS, TagFetchFailure, TrackCandidate, TrackPool, TrackStage,
};

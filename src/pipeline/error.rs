use serde::Serialize;
use thiserror::Error;

/// The four downstream stages of one recommendation run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    RetrieveImages,
    InferMood,
    FetchTracks,
    Generate,
}

impl PipelineStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RetrieveImages => "retrieve_images",
            Self::InferMood => "infer_mood",
            Self::FetchTracks => "fetch_tracks",
            Self::Generate => "generate",
        }
    }
}

/// Fatal pipeline failures. Each aborts the run and reaches the caller
/// verbatim; degraded mood profiles and per-tag fetch failures are recovered
/// inside their stages and never appear here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("embedding store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),
    #[error("mood inference unavailable: {0:#}")]
    InferenceUnavailable(anyhow::Error),
    #[error("recommendation generation unavailable: {0:#}")]
    GenerationUnavailable(anyhow::Error),
}

impl PipelineError {
    /// The stage this failure originated from.
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::StoreUnavailable(_) => PipelineStage::RetrieveImages,
            Self::InferenceUnavailable(_) => PipelineStage::InferMood,
            Self::GenerationUnavailable(_) => PipelineStage::Generate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_their_stage() {
        let store = PipelineError::StoreUnavailable(anyhow::anyhow!("pool exhausted"));
        let mood = PipelineError::InferenceUnavailable(anyhow::anyhow!("timeout"));
        let generate = PipelineError::GenerationUnavailable(anyhow::anyhow!("503"));

        assert_eq!(store.stage(), PipelineStage::RetrieveImages);
        assert_eq!(mood.stage(), PipelineStage::InferMood);
        assert_eq!(generate.stage(), PipelineStage::Generate);
        assert_eq!(generate.stage().as_str(), "generate");
    }

    #[test]
    fn display_includes_cause() {
        let error = PipelineError::InferenceUnavailable(anyhow::anyhow!("connection refused"));
        assert!(error.to_string().contains("connection refused"));
    }
}

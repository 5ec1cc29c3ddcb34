use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use crate::clients::{ChatModel, ChatRequest};

use super::error::PipelineError;
use super::mood::MoodProfile;
use super::tracks::TrackCandidate;

const GENERATE_TEMPERATURE: f32 = 0.8;
const GENERATE_MAX_TOKENS: u32 = 1500;

const GENERATE_SYSTEM_PROMPT: &str = r"You are MuseMix AI. Create personalized music recommendations based on visual mood analysis and available tracks.

Provide:
1. Top 5-8 track recommendations with explanations
2. Why each track matches the visual mood
3. Brief description of the overall playlist vibe

Be creative and insightful in your explanations.";

#[async_trait]
pub trait GenerateStage: Send + Sync {
    /// Turn the mood profile and candidate pool into a ranked, explained
    /// playlist. The reply is opaque free text.
    async fn generate(
        &self,
        profile: &MoodProfile,
        pool: &[TrackCandidate],
    ) -> Result<String, PipelineError>;
}

/// Playlist generation over the chat model, higher temperature than mood
/// inference since the structure is already fixed.
pub struct LlmGenerateStage {
    chat: Arc<dyn ChatModel>,
    pool_cap: usize,
}

impl LlmGenerateStage {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>, pool_cap: usize) -> Self {
        Self { chat, pool_cap }
    }

    fn user_message(
        &self,
        profile: &MoodProfile,
        pool: &[TrackCandidate],
    ) -> Result<String, PipelineError> {
        // Prefix of the pool in accumulation order, to bound prompt size.
        let capped = &pool[..pool.len().min(self.pool_cap)];
        let profile_json = serde_json::to_string_pretty(profile)
            .context("failed to serialize mood profile")
            .map_err(PipelineError::GenerationUnavailable)?;
        let tracks_json = serde_json::to_string_pretty(capped)
            .context("failed to serialize track candidates")
            .map_err(PipelineError::GenerationUnavailable)?;

        Ok(format!(
            "Visual Mood Analysis: {profile_json}\n\nAvailable Tracks: {tracks_json}\n\nCreate a curated playlist that perfectly matches the visual mood. Explain why each recommendation fits.\n"
        ))
    }
}

#[async_trait]
impl GenerateStage for LlmGenerateStage {
    async fn generate(
        &self,
        profile: &MoodProfile,
        pool: &[TrackCandidate],
    ) -> Result<String, PipelineError> {
        let request = ChatRequest {
            system: GENERATE_SYSTEM_PROMPT.to_string(),
            user: self.user_message(profile, pool)?,
            temperature: GENERATE_TEMPERATURE,
            max_tokens: GENERATE_MAX_TOKENS,
        };

        let reply = self
            .chat
            .complete(request)
            .await
            .map_err(PipelineError::GenerationUnavailable)?;

        if reply.trim().is_empty() {
            return Err(PipelineError::GenerationUnavailable(anyhow::anyhow!(
                "chat model returned an empty recommendation"
            )));
        }

        debug!(reply_chars = reply.len(), "recommendations generated");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Mutex;

    struct RecordingChat {
        reply: String,
        last_user_message: Mutex<Option<String>>,
    }

    #[async_trait]
    impl ChatModel for RecordingChat {
        async fn complete(&self, request: ChatRequest) -> Result<String> {
            *self.last_user_message.lock().expect("lock") = Some(request.user);
            Ok(self.reply.clone())
        }
    }

    fn candidate(index: usize) -> TrackCandidate {
        TrackCandidate {
            artist: format!("artist-{index}"),
            title: format!("title-{index}"),
            mood_tag: "chill".to_string(),
            playcount: 0,
        }
    }

    #[tokio::test]
    async fn pool_is_capped_to_prefix() {
        let chat = Arc::new(RecordingChat {
            reply: "1. artist-0 - title-0: fits the calm".to_string(),
            last_user_message: Mutex::new(None),
        });
        let stage = LlmGenerateStage::new(Arc::clone(&chat) as Arc<dyn ChatModel>, 3);
        let pool: Vec<TrackCandidate> = (0..10).map(candidate).collect();

        stage
            .generate(&MoodProfile::default(), &pool)
            .await
            .expect("generation should succeed");

        let message = chat
            .last_user_message
            .lock()
            .expect("lock")
            .clone()
            .expect("message recorded");
        assert!(message.contains("title-0"));
        assert!(message.contains("title-2"));
        assert!(!message.contains("title-3"));
    }

    #[tokio::test]
    async fn empty_reply_is_a_generation_failure() {
        let chat = Arc::new(RecordingChat {
            reply: "   \n".to_string(),
            last_user_message: Mutex::new(None),
        });
        let stage = LlmGenerateStage::new(chat, 20);

        let error = stage
            .generate(&MoodProfile::default(), &[])
            .await
            .expect_err("empty reply must fail");

        assert!(matches!(error, PipelineError::GenerationUnavailable(_)));
    }

    #[tokio::test]
    async fn transport_failure_maps_to_generation_unavailable() {
        struct FailingChat;

        #[async_trait]
        impl ChatModel for FailingChat {
            async fn complete(&self, _request: ChatRequest) -> Result<String> {
                anyhow::bail!("upstream 503")
            }
        }

        let stage = LlmGenerateStage::new(Arc::new(FailingChat), 20);
        let error = stage
            .generate(&MoodProfile::default(), &[])
            .await
            .expect_err("transport failure must fail");

        assert!(matches!(error, PipelineError::GenerationUnavailable(_)));
    }
}

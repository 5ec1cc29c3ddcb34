use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clients::{ChatModel, ChatRequest};

use super::error::PipelineError;

/// Sentinel `visual_mood` marking a profile recovered from an unparseable
/// model reply.
pub const UNPARSED_MOOD: &str = "Could not parse mood";

const MOOD_TEMPERATURE: f32 = 0.5;
const MOOD_MAX_TOKENS: u32 = 1000;

const MOOD_SYSTEM_PROMPT: &str = r#"You are MuseMix AI, an expert at connecting visual moods with music recommendations.

Your task:
1. Analyze the visual context provided
2. Extract mood, energy level, emotions, and atmosphere
3. Suggest music genres, moods, and characteristics that match
4. Return response in JSON format

Response format:
{
    "visual_mood": "description of image mood",
    "energy_level": "low/medium/high",
    "emotions": ["emotion1", "emotion2"],
    "music_moods": ["mood1", "mood2", "mood3"],
    "genres": ["genre1", "genre2"],
    "tempo_preference": "slow/medium/fast",
    "atmosphere": "description"
}"#;

/// Structured mood/genre profile produced per request, never persisted.
/// Every field defaults so a partial model reply still parses; free text is
/// tolerated where the contract names an enumeration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodProfile {
    #[serde(default)]
    pub visual_mood: String,
    #[serde(default)]
    pub energy_level: String,
    #[serde(default)]
    pub emotions: Vec<String>,
    /// Ordered; drives the per-tag track budget downstream.
    #[serde(default)]
    pub music_moods: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tempo_preference: String,
    #[serde(default)]
    pub atmosphere: String,
    /// Verbatim model reply, populated only on the degraded path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Mood inference result. A degraded outcome still carries a usable profile;
/// the track stage falls back to its default tag set.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodOutcome {
    pub profile: MoodProfile,
    pub degraded: bool,
}

#[async_trait]
pub trait MoodStage: Send + Sync {
    /// Derive a mood profile from the retrieval context and optional user
    /// intent. Upstream model failure is fatal; an unparseable reply is not.
    async fn analyze(&self, context: &str, user_prompt: &str)
    -> Result<MoodOutcome, PipelineError>;
}

/// Mood inference over the generative chat model, low temperature for
/// consistency.
pub struct LlmMoodStage {
    chat: Arc<dyn ChatModel>,
}

impl LlmMoodStage {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    fn user_message(context: &str, user_prompt: &str) -> String {
        let intent = if user_prompt.trim().is_empty() {
            "Please analyze this image and suggest matching music"
        } else {
            user_prompt
        };
        format!(
            "Image Context: {context}\nUser Input: {intent}\n\nAnalyze this visual information and provide music recommendations that would match the mood and atmosphere.\n"
        )
    }
}

#[async_trait]
impl MoodStage for LlmMoodStage {
    async fn analyze(
        &self,
        context: &str,
        user_prompt: &str,
    ) -> Result<MoodOutcome, PipelineError> {
        let request = ChatRequest {
            system: MOOD_SYSTEM_PROMPT.to_string(),
            user: Self::user_message(context, user_prompt),
            temperature: MOOD_TEMPERATURE,
            max_tokens: MOOD_MAX_TOKENS,
        };

        let reply = self
            .chat
            .complete(request)
            .await
            .map_err(PipelineError::InferenceUnavailable)?;

        match serde_json::from_str::<MoodProfile>(reply.trim()) {
            Ok(profile) => {
                debug!(
                    music_moods = profile.music_moods.len(),
                    genres = profile.genres.len(),
                    "mood profile parsed"
                );
                Ok(MoodOutcome {
                    profile,
                    degraded: false,
                })
            }
            Err(parse_error) => {
                warn!(%parse_error, "mood reply failed strict parse, degrading");
                Ok(MoodOutcome {
                    profile: MoodProfile {
                        visual_mood: UNPARSED_MOOD.to_string(),
                        raw_response: Some(reply),
                        ..MoodProfile::default()
                    },
                    degraded: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    struct StubChat {
        reply: Result<String, String>,
    }

    #[async_trait]
    impl ChatModel for StubChat {
        async fn complete(&self, _request: ChatRequest) -> Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(anyhow::anyhow!(message.clone())),
            }
        }
    }

    fn stage(reply: Result<String, String>) -> LlmMoodStage {
        LlmMoodStage::new(Arc::new(StubChat { reply }))
    }

    #[tokio::test]
    async fn valid_json_reply_parses_into_profile() {
        let reply = serde_json::json!({
            "visual_mood": "warm sunset calm",
            "energy_level": "low",
            "emotions": ["peaceful", "nostalgic"],
            "music_moods": ["chill", "ambient"],
            "genres": ["lo-fi"],
            "tempo_preference": "slow",
            "atmosphere": "golden hour haze"
        })
        .to_string();

        let outcome = stage(Ok(reply))
            .analyze("Similar images found:\n", "")
            .await
            .expect("analysis should succeed");

        assert!(!outcome.degraded);
        assert_eq!(outcome.profile.visual_mood, "warm sunset calm");
        assert_eq!(outcome.profile.music_moods, vec!["chill", "ambient"]);
        assert!(outcome.profile.raw_response.is_none());
    }

    #[tokio::test]
    async fn partial_json_reply_still_parses_with_defaults() {
        let outcome = stage(Ok(r#"{"visual_mood": "stormy"}"#.to_string()))
            .analyze("Similar images found:\n", "")
            .await
            .expect("analysis should succeed");

        assert!(!outcome.degraded);
        assert_eq!(outcome.profile.visual_mood, "stormy");
        assert!(outcome.profile.music_moods.is_empty());
    }

    #[tokio::test]
    async fn prose_reply_degrades_and_preserves_raw_text() {
        let prose = "The image feels melancholic, maybe try some slow jazz.".to_string();
        let outcome = stage(Ok(prose.clone()))
            .analyze("Similar images found:\n", "")
            .await
            .expect("degraded outcome is not an error");

        assert!(outcome.degraded);
        assert_eq!(outcome.profile.visual_mood, UNPARSED_MOOD);
        assert_eq!(outcome.profile.raw_response.as_deref(), Some(prose.as_str()));
        assert!(outcome.profile.music_moods.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_fatal() {
        let error = stage(Err("connection refused".to_string()))
            .analyze("Similar images found:\n", "")
            .await
            .expect_err("transport failure must abort");

        assert!(matches!(error, PipelineError::InferenceUnavailable(_)));
    }

    #[test]
    fn user_message_falls_back_to_generic_instruction() {
        let with_prompt = LlmMoodStage::user_message("ctx", "upbeat please");
        let without_prompt = LlmMoodStage::user_message("ctx", "  ");

        assert!(with_prompt.contains("User Input: upbeat please"));
        assert!(
            without_prompt
                .contains("User Input: Please analyze this image and suggest matching music")
        );
    }
}

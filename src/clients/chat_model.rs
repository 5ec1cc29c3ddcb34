use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

/// One chat-completion invocation: a fixed system instruction plus a single
/// user message, with sampling controls.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Narrow seam over the generative model so tests can substitute a
/// deterministic stub.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// Client configuration for the Groq-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
}

/// HTTP client for an OpenAI-compatible chat completions API (Groq hosts one
/// at `/openai/v1/chat/completions`).
#[derive(Debug, Clone)]
pub struct GroqChatClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

impl GroqChatClient {
    /// # Errors
    /// Fails when the base URL does not parse or the HTTP client cannot be
    /// built.
    pub fn new(config: ChatClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build chat model HTTP client")?;
        let base_url = Url::parse(&config.base_url).context("invalid chat model base URL")?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            model: config.model,
        })
    }

    /// Cheap reachability probe used by the readiness endpoint.
    ///
    /// # Errors
    /// Fails when the models listing is unreachable or returns an error
    /// status.
    pub async fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("openai/v1/models")
            .context("failed to build chat model ping URL")?;

        self.client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("chat model ping request failed")?
            .error_for_status()
            .context("chat model ping returned error status")?;

        Ok(())
    }
}

#[async_trait]
impl ChatModel for GroqChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let url = self
            .base_url
            .join("openai/v1/chat/completions")
            .context("failed to build chat completions URL")?;

        let body = CompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat model returned error status {status}: {error_body}");
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("failed to deserialize chat completion response")?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .context("chat completion response contained no choices")?;

        Ok(choice.message.content)
    }
}

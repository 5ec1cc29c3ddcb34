use std::time::Duration;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

/// Seam over the external vision-language encoder service.
#[async_trait]
pub trait VisionEncoder: Send + Sync {
    /// Encode raw image bytes into an embedding of the configured dimension.
    async fn encode(&self, image: &[u8]) -> Result<Vec<f32>>;
}

/// Client configuration for the CLIP embedding service.
#[derive(Debug, Clone)]
pub struct EncoderClientConfig {
    pub base_url: String,
    pub model: String,
    pub expected_dim: usize,
    pub total_timeout: Duration,
}

/// HTTP client for a CLIP inference sidecar exposing
/// `POST /v1/embeddings/image`.
#[derive(Debug, Clone)]
pub struct ClipEncoderClient {
    client: Client,
    base_url: Url,
    model: String,
    expected_dim: usize,
}

#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    image_b64: String,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    embedding: Vec<f32>,
    dim: usize,
}

impl ClipEncoderClient {
    /// # Errors
    /// Fails when the base URL does not parse or the HTTP client cannot be
    /// built.
    pub fn new(config: EncoderClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.total_timeout)
            .build()
            .context("failed to build encoder HTTP client")?;
        let base_url = Url::parse(&config.base_url).context("invalid encoder base URL")?;

        Ok(Self {
            client,
            base_url,
            model: config.model,
            expected_dim: config.expected_dim,
        })
    }
}

#[async_trait]
impl VisionEncoder for ClipEncoderClient {
    async fn encode(&self, image: &[u8]) -> Result<Vec<f32>> {
        let url = self
            .base_url
            .join("v1/embeddings/image")
            .context("failed to build encoder URL")?;

        let body = EncodeRequest {
            image_b64: BASE64.encode(image),
            model: &self.model,
        };

        let response: EncodeResponse = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("encoder request failed")?
            .error_for_status()
            .context("encoder returned error status")?
            .json()
            .await
            .context("failed to deserialize encoder response")?;

        ensure!(
            response.dim == self.expected_dim && response.embedding.len() == self.expected_dim,
            "encoder returned dimension {} (embedding length {}), expected {}",
            response.dim,
            response.embedding.len(),
            self.expected_dim
        );

        Ok(response.embedding)
    }
}

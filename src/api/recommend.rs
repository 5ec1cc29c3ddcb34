use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{app::AppState, pipeline::PipelineError};

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendRequest {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    image_b64: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
}

impl ErrorResponse {
    fn bad_request(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                error: message.into(),
                stage: None,
            }),
        )
    }
}

/// One recommendation run. Accepts either a precomputed embedding or raw
/// image bytes; an uploaded image is only encoded, never ingested.
pub(crate) async fn recommend(
    State(state): State<AppState>,
    Json(payload): Json<RecommendRequest>,
) -> impl IntoResponse {
    let expected_dim = state.config().embedding_dim();

    let query_embedding = match (payload.embedding, payload.image_b64) {
        (Some(_), Some(_)) => {
            return ErrorResponse::bad_request("provide either embedding or image_b64, not both")
                .into_response();
        }
        (None, None) => {
            return ErrorResponse::bad_request("one of embedding or image_b64 is required")
                .into_response();
        }
        (Some(embedding), None) => {
            if embedding.len() != expected_dim {
                return ErrorResponse::bad_request(format!(
                    "embedding has dimension {}, expected {expected_dim}",
                    embedding.len()
                ))
                .into_response();
            }
            embedding
        }
        (None, Some(image_b64)) => {
            let image_bytes = match BASE64.decode(&image_b64) {
                Ok(bytes) => bytes,
                Err(decode_error) => {
                    return ErrorResponse::bad_request(format!(
                        "image_b64 is not valid base64: {decode_error}"
                    ))
                    .into_response();
                }
            };
            match state.encoder().encode(&image_bytes).await {
                Ok(embedding) => embedding,
                Err(encode_error) => {
                    error!(error = %format!("{encode_error:#}"), "vision encoder failed");
                    let body = Json(ErrorResponse {
                        error: format!("vision encoder unavailable: {encode_error:#}"),
                        stage: Some("encode"),
                    });
                    return (StatusCode::BAD_GATEWAY, body).into_response();
                }
            }
        }
    };

    let prompt = payload.prompt.unwrap_or_default();
    let top_k = payload.top_k.unwrap_or(state.config().recommend_top_k());

    match state.pipeline().run(&query_embedding, &prompt, top_k).await {
        Ok(recommendation) => (StatusCode::OK, Json(recommendation)).into_response(),
        Err(pipeline_error) => {
            let stage = pipeline_error.stage();
            error!(stage = stage.as_str(), error = %pipeline_error, "pipeline run failed");
            let status = match &pipeline_error {
                PipelineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::InferenceUnavailable(_)
                | PipelineError::GenerationUnavailable(_) => StatusCode::BAD_GATEWAY,
            };
            let body = Json(ErrorResponse {
                error: pipeline_error.to_string(),
                stage: Some(stage.as_str()),
            });
            (status, body).into_response()
        }
    }
}

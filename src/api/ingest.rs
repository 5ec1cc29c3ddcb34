use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::{app::AppState, store::NewImage};

#[derive(Debug, Deserialize)]
pub(crate) struct IngestRequest {
    image_b64: String,
    image_path: String,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    image_id: Uuid,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Encode an uploaded image and persist the resulting record. This is the
/// only write path into the embedding store.
pub(crate) async fn ingest_image(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> impl IntoResponse {
    if payload.image_path.trim().is_empty() {
        let body = Json(ErrorResponse {
            error: "image_path must be non-empty".to_string(),
        });
        return (StatusCode::BAD_REQUEST, body).into_response();
    }

    let image_bytes = match BASE64.decode(&payload.image_b64) {
        Ok(bytes) => bytes,
        Err(decode_error) => {
            let body = Json(ErrorResponse {
                error: format!("image_b64 is not valid base64: {decode_error}"),
            });
            return (StatusCode::BAD_REQUEST, body).into_response();
        }
    };

    let embedding = match state.encoder().encode(&image_bytes).await {
        Ok(embedding) => embedding,
        Err(encode_error) => {
            error!(error = %format!("{encode_error:#}"), "vision encoder failed during ingest");
            let body = Json(ErrorResponse {
                error: format!("vision encoder unavailable: {encode_error:#}"),
            });
            return (StatusCode::BAD_GATEWAY, body).into_response();
        }
    };

    let record = NewImage {
        image_path: payload.image_path,
        embedding,
        embedding_model: state.config().embedding_model().to_string(),
    };

    match state.store().insert(record).await {
        Ok(image_id) => {
            state.telemetry().metrics().images_ingested.inc();
            info!(%image_id, "image ingested");
            (StatusCode::CREATED, Json(IngestResponse { image_id })).into_response()
        }
        Err(insert_error) => {
            error!(error = %format!("{insert_error:#}"), "embedding store insert failed");
            let body = Json(ErrorResponse {
                error: format!("embedding store unavailable: {insert_error:#}"),
            });
            (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
        }
    }
}

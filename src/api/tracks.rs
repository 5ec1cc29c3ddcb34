use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct TagQuery {
    #[serde(default = "default_tag_limit")]
    limit: usize,
}

fn default_tag_limit() -> usize {
    5
}

#[derive(Debug, Serialize)]
struct TrackTagsResponse {
    artist: String,
    title: String,
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Descriptive catalog tags for one track.
pub(crate) async fn track_tags(
    State(state): State<AppState>,
    Path((artist, title)): Path<(String, String)>,
    Query(query): Query<TagQuery>,
) -> impl IntoResponse {
    match state
        .catalog()
        .track_tags(&artist, &title, query.limit)
        .await
    {
        Ok(tags) => (
            StatusCode::OK,
            Json(TrackTagsResponse {
                artist,
                title,
                tags,
            }),
        )
            .into_response(),
        Err(catalog_error) => {
            error!(%artist, %title, error = %format!("{catalog_error:#}"), "track tags lookup failed");
            let body = Json(ErrorResponse {
                error: format!("catalog unavailable: {catalog_error:#}"),
            });
            (StatusCode::BAD_GATEWAY, body).into_response()
        }
    }
}

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct HealthReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl HealthReport {
    fn ready() -> Self {
        Self {
            status: "ready",
            detail: None,
        }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self {
            status: "degraded",
            detail: Some(detail.into()),
        }
    }
}

pub(crate) async fn ready(
    State(state): State<AppState>,
) -> Result<Json<HealthReport>, (StatusCode, Json<HealthReport>)> {
    if let Err(error) = state.chat_client().ping().await {
        error!(error = %format!("{error:#}"), "chat model readiness check failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthReport::degraded(format!("chat_model: {error:#}"))),
        ));
    }

    if let Err(error) = state.catalog_client().ping().await {
        error!(error = %format!("{error:#}"), "catalog readiness check failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthReport::degraded(format!("catalog: {error:#}"))),
        ));
    }

    Ok(Json(HealthReport::ready()))
}

pub(crate) async fn live(State(_state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "live",
        detail: None,
    })
}

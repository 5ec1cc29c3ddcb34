use axum::{extract::State, http::header, response::IntoResponse};

use crate::app::AppState;

pub(crate) async fn exporter(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.telemetry().render_prometheus();
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

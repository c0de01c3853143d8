use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::state::AppState;

/// All rows of the raw release table.
pub async fn raw(State(state): State<AppState>) -> Response {
    Json(&*state.raw).into_response()
}

/// All rows of the aggregated stats table.
pub async fn stats(State(state): State<AppState>) -> Response {
    Json(&*state.stats).into_response()
}

pub async fn health(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "ok",
        "raw_rows": state.raw.len(),
        "stats_rows": state.stats.len(),
    }))
    .into_response()
}

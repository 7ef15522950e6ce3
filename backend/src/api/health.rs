use axum::{
    extract::State,
    http::{header::CACHE_CONTROL, HeaderName, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::{database::queries, state::AppState};

/// Liveness plus a database round-trip.
pub async fn health(
    State(state): State<AppState>,
) -> (StatusCode, [(HeaderName, &'static str); 1], Json<Value>) {
    let no_store = [(CACHE_CONTROL, "no-store")];
    match queries::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            no_store,
            Json(json!({
                "status": "ok",
                "database": "connected",
                "timestamp": Utc::now(),
            })),
        ),
        Err(err) => {
            warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                no_store,
                Json(json!({
                    "status": "error",
                    "database": "disconnected",
                    "timestamp": Utc::now(),
                })),
            )
        }
    }
}

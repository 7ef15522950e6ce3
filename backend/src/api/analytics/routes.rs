use axum::{routing::get, Router};

use super::handlers::hotspots;
use crate::state::AppState;

pub fn analytics_router() -> Router<AppState> {
    Router::new().route("/analytics/hotspots", get(hotspots))
}

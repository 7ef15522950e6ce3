use axum::{routing::get, Router};

use super::handlers::{activity, stats};
use crate::state::AppState;

pub fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/activity", get(activity))
}

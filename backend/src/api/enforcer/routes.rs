use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{dashboard, list_notifications, mark_all_read, mark_read};
use crate::state::AppState;

pub fn enforcer_router() -> Router<AppState> {
    Router::new()
        .route("/enforcer/dashboard", get(dashboard))
        .route("/enforcer/notifications", get(list_notifications))
        .route("/enforcer/notifications/read-all", post(mark_all_read))
        .route("/enforcer/notifications/:id/read", post(mark_read))
}

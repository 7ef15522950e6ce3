use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{issue_direct_ticket, violation_history};
use crate::state::AppState;

pub fn tickets_router() -> Router<AppState> {
    Router::new()
        .route("/tickets", post(issue_direct_ticket))
        .route("/violations/history/:plate", get(violation_history))
}

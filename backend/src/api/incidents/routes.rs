use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{
    dismiss_incident, enforcer_queue, issue_ticket, list_my_incidents, report_incident,
    resolve_incident, take_incident,
};
use crate::state::AppState;

pub fn incidents_router() -> Router<AppState> {
    Router::new()
        .route("/incidents", get(list_my_incidents))
        .route("/incidents/report", post(report_incident))
        .route("/incidents/enforcer", get(enforcer_queue))
        .route("/incidents/:id/take", patch(take_incident))
        .route("/incidents/:id/resolve", patch(resolve_incident))
        .route("/incidents/:id/issue-ticket", patch(issue_ticket))
        .route("/incidents/:id/dismiss", patch(dismiss_incident))
}

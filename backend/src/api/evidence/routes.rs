use axum::{
    routing::{get, patch},
    Router,
};

use super::handlers::{list_evidence, review_evidence, upload_evidence};
use crate::state::AppState;

pub fn evidence_router() -> Router<AppState> {
    Router::new()
        .route(
            "/incidents/:id/evidence",
            get(list_evidence).post(upload_evidence),
        )
        .route("/evidence/:id/review", patch(review_evidence))
}

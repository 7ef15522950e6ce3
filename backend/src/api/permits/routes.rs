use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{create_permit, delete_permit, get_permit, list_permits, renew_permit, update_permit};
use crate::state::AppState;

pub fn permits_router() -> Router<AppState> {
    Router::new()
        .route("/permits", get(list_permits).post(create_permit))
        .route(
            "/permits/:id",
            get(get_permit).put(update_permit).delete(delete_permit),
        )
        .route("/permits/:id/renew", post(renew_permit))
}

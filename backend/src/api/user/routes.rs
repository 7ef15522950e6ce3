use axum::{routing::get, Router};

use super::handlers::{get_profile, list_users, update_profile};
use crate::state::AppState;

pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/user/profile", get(get_profile).put(update_profile))
}

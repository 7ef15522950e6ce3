//! HTTP routes for authentication, nested under `/api/auth`.

use axum::{routing::post, Router};

use super::handlers::{login, logout, register, request_reset, reset_password, verify_reset_token};
use crate::state::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/request-reset", post(request_reset))
        .route("/verify-reset-token", post(verify_reset_token))
        .route("/reset-password", post(reset_password))
}

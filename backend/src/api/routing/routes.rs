use axum::{routing::get, Router};

use super::handlers::{gps_route, gps_usage, smart_route, smart_usage};
use crate::state::AppState;

pub fn routing_router() -> Router<AppState> {
    Router::new()
        .route("/routes/smart", get(smart_usage).post(smart_route))
        .route("/routes/gps", get(gps_usage).post(gps_route))
}

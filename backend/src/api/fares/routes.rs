use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{calculate, list_calculations, route_history, save_calculation};
use crate::state::AppState;

pub fn fares_router() -> Router<AppState> {
    Router::new()
        .route("/fare/calculate", post(calculate))
        .route(
            "/fare-calculations",
            get(list_calculations).post(save_calculation),
        )
        .route("/routes", get(route_history))
}

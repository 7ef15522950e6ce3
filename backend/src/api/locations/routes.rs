use axum::{routing::get, Router};

use super::handlers::list_locations;
use crate::state::AppState;

pub fn locations_router() -> Router<AppState> {
    Router::new().route("/locations", get(list_locations))
}

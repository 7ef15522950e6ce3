use axum::{routing::get, Router};

use super::handlers::{
    create_vehicle, deactivate_vehicle, get_vehicle, list_drivers, list_vehicles, update_vehicle,
};
use crate::state::AppState;

pub fn vehicles_router() -> Router<AppState> {
    Router::new()
        .route("/drivers", get(list_drivers))
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/vehicles/:id",
            get(get_vehicle).patch(update_vehicle).delete(deactivate_vehicle),
        )
}

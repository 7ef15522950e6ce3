use axum::{
    routing::{get, post},
    Router,
};

use super::{discount_cards, locations, operations, users};
use crate::state::AppState;

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(users::list_users))
        .route("/admin/users/pending", get(users::list_pending))
        .route("/admin/users/verify", post(users::verify_user))
        .route("/admin/users/toggle-status", post(users::toggle_status))
        .route("/admin/users/create", post(users::create_official))
        .route("/admin/reset-password", post(users::reset_password))
        .route("/admin/incidents/stats", get(operations::incident_stats))
        .route("/admin/reports", get(operations::system_report))
        .route("/admin/storage", get(operations::storage_overview))
        .route("/admin/storage/cleanup", post(operations::cleanup_storage))
        .route(
            "/admin/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route("/admin/locations/validate", post(locations::validate_location))
        .route(
            "/admin/locations/:id",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route(
            "/admin/discount-cards",
            get(discount_cards::list_cards).patch(discount_cards::review_card),
        )
        .route("/admin/discount-cards/create", post(discount_cards::create_override))
}

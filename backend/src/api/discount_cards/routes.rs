use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{apply, my_application, my_card, update_my_application, validate_id};
use crate::state::AppState;

pub fn discount_cards_router() -> Router<AppState> {
    Router::new()
        .route("/discount-cards/apply", post(apply))
        .route("/discount-cards/me", get(my_card))
        .route(
            "/discount-cards/my-application",
            get(my_application).patch(update_my_application),
        )
        .route("/discount-cards/validate-id", post(validate_id))
}

use axum::{routing::get, Router};

use crate::app_state::AppState;

use super::handlers::get_available_slots;

pub fn availability_routes() -> Router<AppState> {
    Router::new().route("/availability", get(get_available_slots))
}

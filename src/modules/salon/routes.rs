use axum::{routing::get, Router};

use crate::app_state::AppState;

use super::handlers::get_salon_services;

pub fn salon_routes() -> Router<AppState> {
    Router::new().route("/services", get(get_salon_services))
}

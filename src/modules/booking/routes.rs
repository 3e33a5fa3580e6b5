use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{confirm_appointment, create_booking};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/confirm/{token}", get(confirm_appointment))
}

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{
    cancel_appointment, create_appointment, create_schedule, deactivate_schedule, list_services,
    update_appointment, update_schedule,
};

pub fn manage_routes() -> Router<AppState> {
    Router::new()
        .route("/schedules", post(create_schedule))
        .route("/schedules/{id}", put(update_schedule))
        .route("/schedules/{id}/deactivate", post(deactivate_schedule))
        .route("/services", get(list_services))
        .route("/appointments", post(create_appointment))
        .route("/appointments/{id}", put(update_appointment))
        .route("/appointments/{id}/cancel", post(cancel_appointment))
}

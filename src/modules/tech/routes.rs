use axum::{
    routing::get,
    Router,
};

use crate::app_state::AppState;

use super::handlers::{get_calendar_day, get_settings, update_settings};

pub fn tech_routes() -> Router<AppState> {
    Router::new()
        .route("/calendar", get(get_calendar_day))
        .route("/settings", get(get_settings).put(update_settings))
}

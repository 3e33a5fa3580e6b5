use axum::{routing::get, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    app_state::AppState,
    modules::{
        availability::routes::availability_routes, booking::routes::booking_routes,
        manage::routes::manage_routes, salon::routes::salon_routes, tech::routes::tech_routes,
    },
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .merge(availability_routes())
        .merge(booking_routes())
        .merge(salon_routes())
        .nest("/manage", manage_routes())
        .nest("/tech", tech_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn hello() -> &'static str {
    "Salon backend says hello!\n"
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let db_result = sqlx::query("SELECT 1").execute(&state.db).await;

    let db_status = match db_result {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::info!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
        }
    }))
}

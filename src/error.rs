use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::models::InvalidTransition;
use crate::db::DatabaseError;
use crate::modules::format_time;
use crate::scheduling::conflict::ConflictInfo;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(#[from] InvalidTransition),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Scheduling conflict with {} existing appointment(s)", .0.len())]
    Conflict(Vec<ConflictInfo>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Conflicts are not failures: they carry the overlapping appointments
        // so the caller can offer a "force anyway" override.
        if let AppError::Conflict(ref conflicts) = self {
            let overlaps: Vec<_> = conflicts
                .iter()
                .map(|c| {
                    json!({
                        "appointment_id": c.agreement_id,
                        "start_time": format_time(c.start_time),
                        "end_time": format_time(c.end_time),
                        "client_name": c.client_name,
                        "service_name": c.service_name,
                    })
                })
                .collect();

            let body = Json(json!({
                "error": { "message": "Overlapping appointments detected" },
                "overlaps": overlaps,
            }));
            return (StatusCode::CONFLICT, body).into_response();
        }

        let (status, error_message) = match self {
            AppError::Database(ref err) => match err {
                DatabaseError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
                DatabaseError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input data"),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                ),
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation error"),
            AppError::InvalidState(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Appointment is not in a state that allows this operation",
            ),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
            AppError::Conflict(_) => unreachable!("handled above"),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "details": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

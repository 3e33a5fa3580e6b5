use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{hash_token, Agreement, AgreementStatus};
use crate::db::repositories::{
    AccountRepository, AgreementRepository, PgAgreementRepository, ServiceRepository,
};
use crate::error::{AppError, AppResult};
use crate::modules::{ensure_within_day, parse_date, parse_time};
use crate::scheduling::confirmation::{resolve_token, TokenOutcome};
use crate::email::{NotificationKind, TechNotification};

#[derive(Debug, Deserialize, Validate)]
pub struct BookingRequest {
    pub salon: Uuid,
    pub service: Uuid,
    pub technician: Uuid,
    #[validate(email)]
    pub client_email: String,
    #[validate(length(min = 1, message = "Client name must not be empty"))]
    pub client_name: String,
    pub date: String,
    pub start_time: String,
}

/// Creates a pending agreement holding the requested slot and emails the
/// client a confirmation link. The hold lapses after the configured
/// confirmation window unless the link is clicked.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> AppResult<Response> {
    request
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let date = parse_date(&request.date)?;
    let start_time = parse_time(&request.start_time)?;

    info!(client_email = %request.client_email, "processing booking request");

    let accounts = AccountRepository::new(state.db.clone());
    let salon = accounts
        .get_salon(request.salon)
        .await?
        .ok_or_else(|| AppError::NotFound("salon".into()))?;
    let technician = accounts
        .get_technician(request.technician)
        .await?
        .ok_or_else(|| AppError::NotFound("technician".into()))?;
    let service = ServiceRepository::new(state.db.clone())
        .get_by_id(request.service)
        .await?
        .ok_or_else(|| AppError::NotFound("service".into()))?;
    ensure_within_day(start_time, service.duration_minutes)?;

    let client = accounts
        .get_or_create_client(&request.client_name, &request.client_email)
        .await?;

    let now = state.env.salon_now();
    let mut agreement = Agreement {
        id: Uuid::new_v4(),
        date,
        start_time,
        service: service.clone(),
        technician_id: technician.id,
        client_id: client.id,
        client_name: client.name,
        client_email: client.email.clone(),
        salon_id: salon.id,
        status: AgreementStatus::Pending,
        confirm_token_hash: None,
        expires_at: None,
        confirmed_at: None,
        created_at: now,
    };
    let token = agreement.mark_pending(now, state.env.booking.confirmation_hold_minutes);

    PgAgreementRepository::new(state.db.clone())
        .save(&agreement)
        .await?;
    info!(agreement_id = %agreement.id, "pending agreement saved");

    // The hold is committed; a failed email never rolls it back.
    if let Err(err) = state.email.send_confirmation_link(&client.email, &token).await {
        error!(agreement_id = %agreement.id, "failed to send confirmation link: {err}");
    }

    if technician.notify_by_email {
        let notification = TechNotification {
            to: technician.email,
            kind: NotificationKind::Booked,
            date,
            time: start_time,
            service_name: service.name,
            service_duration_minutes: service.duration_minutes,
            previous: None,
        };
        if let Err(err) = state.email.send_tech_notification(&notification).await {
            error!(technician_id = %technician.id, "failed to notify technician: {err}");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": agreement.id, "status": "pending" })),
    )
        .into_response())
}

/// Resolves a confirmation link clicked from email. Expired links recover by
/// re-issuing a fresh hold and sending a new email.
pub async fn confirm_appointment(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Response> {
    let hash = hash_token(token.trim());
    let repo = PgAgreementRepository::new(state.db.clone());

    let outcome = resolve_token(
        &repo,
        state.email.as_ref(),
        &hash,
        state.env.salon_now(),
        state.env.booking.confirmation_hold_minutes,
    )
    .await?;

    let (status, message) = match outcome {
        TokenOutcome::Confirmed => (StatusCode::OK, "Appointment confirmed."),
        TokenOutcome::AlreadyConfirmed => (StatusCode::OK, "Appointment was already confirmed."),
        TokenOutcome::ExpiredReissued => (
            StatusCode::GONE,
            "This link expired; a new confirmation email is on its way.",
        ),
        TokenOutcome::Cancelled => (StatusCode::GONE, "This appointment was cancelled."),
        TokenOutcome::NotFound => (StatusCode::NOT_FOUND, "No appointment found for this link."),
    };

    Ok((status, Json(json!({ "message": message }))).into_response())
}

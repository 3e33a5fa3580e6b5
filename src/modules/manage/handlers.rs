use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{
    Agreement, AgreementStatus, DayTimeRange, InvalidTransition, Schedule, Service, Technician,
};
use crate::db::repositories::{
    AccountRepository, AgreementRepository, PgAgreementRepository, ScheduleRepository,
    ServiceRepository,
};
use crate::email::{ClientNotification, NotificationKind, PreviousBooking, TechNotification};
use crate::error::{AppError, AppResult};
use crate::modules::{ensure_within_day, parse_date, parse_time, parse_weekday};
use crate::scheduling::conflict::find_conflicts;

#[derive(Debug, Deserialize)]
pub struct TimeRangeDto {
    pub day: String,
    pub begin_time: String,
    pub end_time: String,
}

/// Parses and validates inbound time ranges. `begin < end` is enforced here,
/// at the edit boundary, before anything is written.
fn parse_ranges(ranges: &[TimeRangeDto]) -> Result<Vec<DayTimeRange>, AppError> {
    ranges
        .iter()
        .map(|dto| {
            let day = parse_weekday(&dto.day)?;
            let begin_time = parse_time(&dto.begin_time)?;
            let end_time = parse_time(&dto.end_time)?;
            if begin_time >= end_time {
                return Err(AppError::Validation(format!(
                    "begin time must be before end time for {}",
                    dto.day
                )));
            }
            Ok(DayTimeRange {
                day,
                begin_time,
                end_time,
            })
        })
        .collect()
}

// ── Schedules ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub technician_id: Uuid,
    pub effective_start: String,
    pub effective_end: Option<String>,
    #[serde(default)]
    pub is_outage: bool,
    pub release_window_days: Option<i32>,
    pub time_ranges: Vec<TimeRangeDto>,
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<CreateScheduleRequest>,
) -> AppResult<Response> {
    let effective_start = parse_date(&request.effective_start)?;
    let effective_end = request
        .effective_end
        .as_deref()
        .map(parse_date)
        .transpose()?;
    let day_ranges = parse_ranges(&request.time_ranges)?;

    let technician = AccountRepository::new(state.db.clone())
        .get_technician(request.technician_id)
        .await?
        .ok_or_else(|| AppError::NotFound("technician".into()))?;

    let schedule = Schedule {
        id: Uuid::new_v4(),
        technician_id: technician.id,
        salon_id: technician.salon_id,
        effective_start,
        effective_end,
        is_outage: request.is_outage,
        day_ranges,
        release_window_days: request.release_window_days.unwrap_or(30),
    };

    let id = ScheduleRepository::new(state.db.clone())
        .create(&schedule)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    pub technician_id: Uuid,
    pub effective_start: String,
    pub effective_end: Option<String>,
    #[serde(default)]
    pub is_outage: bool,
    pub time_ranges: Vec<TimeRangeDto>,
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
    Json(request): Json<UpdateScheduleRequest>,
) -> AppResult<Response> {
    let effective_start = parse_date(&request.effective_start)?;
    let effective_end = request
        .effective_end
        .as_deref()
        .map(parse_date)
        .transpose()?;
    let day_ranges = parse_ranges(&request.time_ranges)?;

    let schedules = ScheduleRepository::new(state.db.clone());
    let schedule = schedules
        .get_by_id(schedule_id)
        .await?
        .filter(|s| s.technician_id == request.technician_id)
        .ok_or_else(|| AppError::NotFound("schedule".into()))?;

    schedules
        .update_fields(schedule.id, effective_start, effective_end, request.is_outage)
        .await?;
    schedules.replace_time_ranges(schedule.id, &day_ranges).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
pub struct DeactivateScheduleRequest {
    pub technician_id: Uuid,
}

pub async fn deactivate_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
    Json(request): Json<DeactivateScheduleRequest>,
) -> AppResult<Response> {
    let schedules = ScheduleRepository::new(state.db.clone());
    let schedule = schedules
        .get_by_id(schedule_id)
        .await?
        .filter(|s| s.technician_id == request.technician_id)
        .ok_or_else(|| AppError::NotFound("schedule".into()))?;

    schedules
        .deactivate(schedule.id, state.env.salon_now().date())
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

// ── Appointments ─────────────────────────────────────────────────────────

pub async fn list_services(State(state): State<AppState>) -> AppResult<Response> {
    let services = ServiceRepository::new(state.db.clone()).get_all().await?;
    Ok(Json(services).into_response())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub technician_id: Uuid,
    pub service_id: Uuid,
    #[validate(length(min = 1, message = "Client name must not be empty"))]
    pub client_name: String,
    #[validate(email)]
    pub client_email: String,
    pub date: String,
    pub time: String,
    /// Create even if the slot overlaps existing appointments.
    #[serde(default)]
    pub force: bool,
}

/// Walk-in/phone booking entered by the technician. Skips the confirmation
/// hold entirely: the appointment is created Confirmed.
pub async fn create_appointment(
    State(state): State<AppState>,
    Json(request): Json<CreateAppointmentRequest>,
) -> AppResult<Response> {
    request
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let date = parse_date(&request.date)?;
    let time = parse_time(&request.time)?;

    let accounts = AccountRepository::new(state.db.clone());
    let technician = accounts
        .get_technician(request.technician_id)
        .await?
        .ok_or_else(|| AppError::NotFound("technician".into()))?;
    let service = ServiceRepository::new(state.db.clone())
        .get_by_id(request.service_id)
        .await?
        .ok_or_else(|| AppError::NotFound("service".into()))?;
    ensure_within_day(time, service.duration_minutes)?;

    let agreements = PgAgreementRepository::new(state.db.clone());
    let existing = agreements
        .get_active_for_technician_on_date(date, technician.id)
        .await?;
    let conflicts = find_conflicts(time, service.duration_minutes, &existing, None);
    if !conflicts.is_empty() && !request.force {
        return Err(AppError::Conflict(conflicts));
    }

    let client = accounts
        .get_or_create_client(&request.client_name, &request.client_email)
        .await?;

    let now = state.env.salon_now();
    let agreement = Agreement {
        id: Uuid::new_v4(),
        date,
        start_time: time,
        service: service.clone(),
        technician_id: technician.id,
        client_id: client.id,
        client_name: client.name.clone(),
        client_email: client.email.clone(),
        salon_id: technician.salon_id,
        status: AgreementStatus::Confirmed,
        confirm_token_hash: None,
        expires_at: None,
        confirmed_at: Some(now),
        created_at: now,
    };
    let id = agreements.save(&agreement).await?;

    let notification = ClientNotification {
        to: client.email,
        client_name: client.name,
        kind: NotificationKind::Booked,
        date,
        time,
        service_name: service.name,
        service_duration_minutes: service.duration_minutes,
        previous: None,
    };
    if let Err(err) = state.email.send_client_notification(&notification).await {
        error!(agreement_id = %id, "failed to send booking notification to client: {err}");
    }

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub technician_id: Uuid,
    pub date: String,
    pub time: String,
    pub service_id: Uuid,
    /// Apply even if the new slot overlaps existing appointments.
    #[serde(default)]
    pub force: bool,
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> AppResult<Response> {
    let new_date = parse_date(&request.date)?;
    let new_time = parse_time(&request.time)?;

    let agreements = PgAgreementRepository::new(state.db.clone());
    let agreement = agreements
        .get_by_id(appointment_id)
        .await?
        .filter(|a| a.technician_id == request.technician_id)
        .ok_or_else(|| AppError::NotFound("appointment".into()))?;

    if matches!(
        agreement.status,
        AgreementStatus::Expired | AgreementStatus::Cancelled
    ) {
        return Err(AppError::InvalidState(InvalidTransition(agreement.status)));
    }

    let new_service = ServiceRepository::new(state.db.clone())
        .get_by_id(request.service_id)
        .await?
        .ok_or_else(|| AppError::NotFound("service".into()))?;
    ensure_within_day(new_time, new_service.duration_minutes)?;

    // Conflict check against the technician's day, never against itself.
    let others = agreements
        .get_active_for_technician_on_date(new_date, request.technician_id)
        .await?;
    let conflicts = find_conflicts(
        new_time,
        new_service.duration_minutes,
        &others,
        Some(agreement.id),
    );
    if !conflicts.is_empty() && !request.force {
        return Err(AppError::Conflict(conflicts));
    }

    let previous = PreviousBooking {
        date: agreement.date,
        time: agreement.start_time,
        service_name: agreement.service.name.clone(),
    };

    let updated = Agreement {
        date: new_date,
        start_time: new_time,
        service: new_service.clone(),
        ..agreement
    };
    agreements.update(&updated).await?;

    notify_change(
        &state,
        &updated,
        &new_service,
        NotificationKind::Modified,
        Some(previous),
    )
    .await;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
pub struct CancelAppointmentRequest {
    pub technician_id: Uuid,
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> AppResult<Response> {
    let agreements = PgAgreementRepository::new(state.db.clone());
    let agreement = agreements
        .get_by_id(appointment_id)
        .await?
        .filter(|a| a.technician_id == request.technician_id)
        .ok_or_else(|| AppError::NotFound("appointment".into()))?;

    agreements.cancel(agreement.id).await?;

    let service = agreement.service.clone();
    notify_change(&state, &agreement, &service, NotificationKind::Cancelled, None).await;

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Fans out "modified"/"cancelled" notices to the technician (when opted in)
/// and the client. Failures are logged; the mutation already stands.
async fn notify_change(
    state: &AppState,
    agreement: &Agreement,
    service: &Service,
    kind: NotificationKind,
    previous: Option<PreviousBooking>,
) {
    let technician: Option<Technician> = match AccountRepository::new(state.db.clone())
        .get_technician(agreement.technician_id)
        .await
    {
        Ok(tech) => tech,
        Err(err) => {
            error!(technician_id = %agreement.technician_id, "technician lookup failed: {err}");
            None
        }
    };

    if let Some(technician) = technician.filter(|t| t.notify_by_email) {
        let notification = TechNotification {
            to: technician.email,
            kind,
            date: agreement.date,
            time: agreement.start_time,
            service_name: service.name.clone(),
            service_duration_minutes: service.duration_minutes,
            previous: previous.clone(),
        };
        if let Err(err) = state.email.send_tech_notification(&notification).await {
            error!(agreement_id = %agreement.id, "failed to notify technician: {err}");
        }
    }

    let notification = ClientNotification {
        to: agreement.client_email.clone(),
        client_name: agreement.client_name.clone(),
        kind,
        date: agreement.date,
        time: agreement.start_time,
        service_name: service.name.clone(),
        service_duration_minutes: service.duration_minutes,
        previous,
    };
    if let Err(err) = state.email.send_client_notification(&notification).await {
        error!(agreement_id = %agreement.id, "failed to notify client: {err}");
    }
}

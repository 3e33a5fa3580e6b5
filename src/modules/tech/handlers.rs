use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::{Agreement, AgreementStatus, Schedule};
use crate::db::repositories::{
    AccountRepository, AgreementRepository, PgAgreementRepository, ScheduleRepository,
};
use crate::error::{AppError, AppResult};
use crate::modules::{format_date, format_time, parse_date};

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub technician_id: Uuid,
    pub date: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TimeRangeDto {
    pub begin_time: String,
    pub end_time: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleSummaryDto {
    pub id: Uuid,
    pub effective_start: String,
    pub effective_end: Option<String>,
    pub is_outage: bool,
    pub time_ranges_for_day: Vec<TimeRangeDto>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentSummaryDto {
    pub id: Uuid,
    pub date: String,
    pub time: String,
    pub service_name: String,
    pub service_duration_minutes: i32,
    pub client_name: String,
    pub status: AgreementStatus,
}

#[derive(Debug, Serialize)]
pub struct CalendarDayDto {
    pub schedules: Vec<ScheduleSummaryDto>,
    pub appointments: Vec<AppointmentSummaryDto>,
}

/// Assembles one day of a technician's calendar: every schedule active on the
/// date with its ranges narrowed to that weekday, plus the day's appointments
/// ordered by start time.
fn day_view(schedules: &[Schedule], appointments: &[Agreement], date: Date) -> CalendarDayDto {
    let schedules = schedules
        .iter()
        .filter(|s| s.is_active_on(date))
        .map(|schedule| ScheduleSummaryDto {
            id: schedule.id,
            effective_start: format_date(schedule.effective_start),
            effective_end: schedule.effective_end.map(format_date),
            is_outage: schedule.is_outage,
            time_ranges_for_day: schedule
                .day_ranges
                .iter()
                .filter(|range| range.day == date.weekday())
                .map(|range| TimeRangeDto {
                    begin_time: format_time(range.begin_time),
                    end_time: format_time(range.end_time),
                })
                .collect(),
        })
        .collect();

    let mut ordered: Vec<&Agreement> = appointments.iter().collect();
    ordered.sort_by_key(|a| a.start_time);
    let appointments = ordered
        .into_iter()
        .map(|agreement| AppointmentSummaryDto {
            id: agreement.id,
            date: format_date(agreement.date),
            time: format_time(agreement.start_time),
            service_name: agreement.service.name.clone(),
            service_duration_minutes: agreement.service.duration_minutes,
            client_name: agreement.client_name.clone(),
            status: agreement.status,
        })
        .collect();

    CalendarDayDto {
        schedules,
        appointments,
    }
}

pub async fn get_calendar_day(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarDayDto>> {
    let date = parse_date(&query.date)?;

    AccountRepository::new(state.db.clone())
        .get_technician(query.technician_id)
        .await?
        .ok_or_else(|| AppError::NotFound("technician".into()))?;

    let schedules = ScheduleRepository::new(state.db.clone())
        .get_for_technician(query.technician_id)
        .await?;
    let appointments = PgAgreementRepository::new(state.db.clone())
        .get_active_for_technician_on_date(date, query.technician_id)
        .await?;

    Ok(Json(day_view(&schedules, &appointments, date)))
}

// ── Settings ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    pub technician_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TechSettingsDto {
    pub email_notifications_enabled: bool,
}

pub async fn get_settings(
    State(state): State<AppState>,
    Query(query): Query<SettingsQuery>,
) -> AppResult<Json<TechSettingsDto>> {
    let technician = AccountRepository::new(state.db.clone())
        .get_technician(query.technician_id)
        .await?
        .ok_or_else(|| AppError::NotFound("technician".into()))?;

    Ok(Json(TechSettingsDto {
        email_notifications_enabled: technician.notify_by_email,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTechSettingsRequest {
    pub technician_id: Uuid,
    pub email_notifications_enabled: bool,
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateTechSettingsRequest>,
) -> AppResult<Response> {
    AccountRepository::new(state.db.clone())
        .set_notify_by_email(request.technician_id, request.email_notifications_enabled)
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::repositories::{
    AccountRepository, AgreementRepository, PgAgreementRepository, ScheduleRepository,
    ServiceRepository,
};
use crate::error::{AppError, AppResult};
use crate::modules::{format_date, format_time, parse_date};
use crate::scheduling::availability::{available_start_times, normalize, TechSlotsOnDate};

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub salon: Uuid,
    pub service: Uuid,
    pub date_begin: String,
    pub date_end: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceDto {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
}

#[derive(Debug, Serialize)]
pub struct TechSlotsDto {
    pub technician_id: Uuid,
    pub date: String,
    pub service: ServiceDto,
    pub available_start_times: Vec<String>,
}

/// Open slots for one service at one salon across a date range, fanned out
/// per technician schedule per date and normalized into one entry per
/// (technician, date).
pub async fn get_available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Vec<TechSlotsDto>>> {
    let date_begin = parse_date(&query.date_begin)?;
    let date_end = parse_date(&query.date_end)?;
    if date_end < date_begin {
        return Err(AppError::Validation(
            "end date must not be before start date".into(),
        ));
    }

    let accounts = AccountRepository::new(state.db.clone());
    accounts
        .get_salon(query.salon)
        .await?
        .ok_or_else(|| AppError::NotFound("salon".into()))?;

    let service = ServiceRepository::new(state.db.clone())
        .get_by_id(query.service)
        .await?
        .ok_or_else(|| AppError::NotFound("service".into()))?;

    let schedules = ScheduleRepository::new(state.db.clone())
        .get_for_salon(query.salon)
        .await?;
    if schedules.is_empty() {
        return Err(AppError::NotFound("no schedules for this salon".into()));
    }

    let agreements = PgAgreementRepository::new(state.db.clone());
    let now = state.env.salon_now();
    let granularity = state.env.booking.slot_granularity_minutes;

    let mut raw = Vec::new();
    let mut date = date_begin;
    loop {
        for schedule in &schedules {
            let existing = agreements
                .get_active_for_technician_on_date(date, schedule.technician_id)
                .await?;

            let start_times = available_start_times(
                std::slice::from_ref(schedule),
                date,
                service.duration_minutes,
                &existing,
                now,
                granularity,
            );

            if !start_times.is_empty() {
                raw.push(TechSlotsOnDate {
                    technician_id: schedule.technician_id,
                    date,
                    service: service.clone(),
                    start_times,
                });
            }
        }

        if date >= date_end {
            break;
        }
        date = match date.next_day() {
            Some(next) => next,
            None => break,
        };
    }

    let slots = normalize(raw)
        .into_iter()
        .map(|slot| TechSlotsDto {
            technician_id: slot.technician_id,
            date: format_date(slot.date),
            service: ServiceDto {
                id: slot.service.id,
                name: slot.service.name,
                duration_minutes: slot.service.duration_minutes,
            },
            available_start_times: slot.start_times.into_iter().map(format_time).collect(),
        })
        .collect();

    Ok(Json(slots))
}

use std::collections::BTreeSet;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::repositories::{AccountRepository, ScheduleRepository, ServiceRepository};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct SalonServicesQuery {
    pub salon: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ServiceDto {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
}

#[derive(Debug, Serialize)]
pub struct TechnicianServicesDto {
    pub technician_id: Uuid,
    pub name: String,
    pub services: Vec<ServiceDto>,
}

#[derive(Debug, Serialize)]
pub struct SalonServicesDto {
    pub salon_id: Uuid,
    pub technicians: Vec<TechnicianServicesDto>,
}

/// Directory of a salon's technicians and the services each offers, for the
/// booking form's first step. Technicians appear iff they have a schedule at
/// the salon; a salon without schedules is treated as not found.
pub async fn get_salon_services(
    State(state): State<AppState>,
    Query(query): Query<SalonServicesQuery>,
) -> AppResult<Json<SalonServicesDto>> {
    let accounts = AccountRepository::new(state.db.clone());
    let salon = accounts
        .get_salon(query.salon)
        .await?
        .ok_or_else(|| AppError::NotFound("salon".into()))?;

    let schedules = ScheduleRepository::new(state.db.clone())
        .get_for_salon(salon.id)
        .await?;
    if schedules.is_empty() {
        return Err(AppError::NotFound("no schedules for this salon".into()));
    }

    let services = ServiceRepository::new(state.db.clone());
    let mut seen: BTreeSet<Uuid> = BTreeSet::new();
    let mut technicians = Vec::new();

    for schedule in &schedules {
        if !seen.insert(schedule.technician_id) {
            continue;
        }
        let Some(technician) = accounts.get_technician(schedule.technician_id).await? else {
            continue;
        };
        let offered = services.get_for_technician(technician.id).await?;

        technicians.push(TechnicianServicesDto {
            technician_id: technician.id,
            name: technician.name,
            services: offered
                .into_iter()
                .map(|service| ServiceDto {
                    id: service.id,
                    name: service.name,
                    duration_minutes: service.duration_minutes,
                })
                .collect(),
        });
    }

    Ok(Json(SalonServicesDto {
        salon_id: salon.id,
        technicians,
    }))
}

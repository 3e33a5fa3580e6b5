use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable reference data describing a bookable service.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub max_participants: i32,
}

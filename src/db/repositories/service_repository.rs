use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Service;
use crate::db::DatabaseError;

pub struct ServiceRepository {
    pool: PgPool,
}

impl ServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Service>, DatabaseError> {
        let service = sqlx::query_as::<_, Service>(
            "SELECT id, name, duration_minutes, max_participants FROM services WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(service)
    }

    /// Services a technician offers, per the technician_services association.
    pub async fn get_for_technician(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<Service>, DatabaseError> {
        let services = sqlx::query_as::<_, Service>(
            "SELECT s.id, s.name, s.duration_minutes, s.max_participants \
             FROM services s \
             JOIN technician_services ts ON ts.service_id = s.id \
             WHERE ts.technician_id = $1 ORDER BY s.name",
        )
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    pub async fn get_all(&self) -> Result<Vec<Service>, DatabaseError> {
        let services = sqlx::query_as::<_, Service>(
            "SELECT id, name, duration_minutes, max_participants FROM services ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }
}

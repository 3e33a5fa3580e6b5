use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Client, Salon, Technician};
use crate::db::DatabaseError;

pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_salon(&self, id: Uuid) -> Result<Option<Salon>, DatabaseError> {
        let salon = sqlx::query_as::<_, Salon>("SELECT id, name FROM salons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(salon)
    }

    pub async fn get_technician(&self, id: Uuid) -> Result<Option<Technician>, DatabaseError> {
        let technician = sqlx::query_as::<_, Technician>(
            "SELECT id, salon_id, name, email, notify_by_email FROM technicians WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(technician)
    }

    pub async fn set_notify_by_email(
        &self,
        technician_id: Uuid,
        enabled: bool,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE technicians SET notify_by_email = $2 WHERE id = $1")
            .bind(technician_id)
            .bind(enabled)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    /// Returns the client with this email, creating one on first booking.
    /// The returning-on-conflict trick keeps this a single round trip.
    pub async fn get_or_create_client(
        &self,
        name: &str,
        email: &str,
    ) -> Result<Client, DatabaseError> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (name, email)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, name, email
            "#,
        )
        .bind(name)
        .bind(email.to_lowercase())
        .fetch_one(&self.pool)
        .await?;
        Ok(client)
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::db::models::{Agreement, AgreementStatus, Service};
use crate::db::DatabaseError;

/// Persistence contract for agreements. The scheduling core only talks to
/// this trait so the lifecycle and sweeper can run against an in-memory
/// double in tests.
#[async_trait]
pub trait AgreementRepository: Send + Sync {
    async fn save(&self, agreement: &Agreement) -> Result<Uuid, DatabaseError>;

    async fn update(&self, agreement: &Agreement) -> Result<(), DatabaseError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Agreement>, DatabaseError>;

    /// Pending and Confirmed agreements only; Expired and Cancelled never
    /// block a slot.
    async fn get_active_for_technician_on_date(
        &self,
        date: Date,
        technician_id: Uuid,
    ) -> Result<Vec<Agreement>, DatabaseError>;

    /// Pending agreements whose hold lapsed before `now`.
    async fn get_expired_pending(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<Agreement>, DatabaseError>;

    async fn get_by_confirm_token_hash(
        &self,
        hash: &str,
    ) -> Result<Option<Agreement>, DatabaseError>;

    /// Compare-and-swap confirmation: flips Pending to Confirmed in one
    /// statement and reports whether this caller won. Two simultaneous
    /// clicks on the same link must produce exactly one transition.
    async fn confirm_if_pending(
        &self,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<bool, DatabaseError>;

    async fn cancel(&self, id: Uuid) -> Result<(), DatabaseError>;
}

const SELECT_AGREEMENT: &str = r#"
    SELECT a.id, a.date, a.start_time, a.technician_id, a.client_id, a.salon_id,
           a.status, a.confirm_token_hash, a.expires_at, a.confirmed_at, a.created_at,
           s.id AS service_id, s.name AS service_name,
           s.duration_minutes, s.max_participants,
           c.name AS client_name, c.email AS client_email
    FROM agreements a
    JOIN services s ON s.id = a.service_id
    JOIN clients c ON c.id = a.client_id
"#;

#[derive(sqlx::FromRow)]
struct AgreementRow {
    id: Uuid,
    date: Date,
    start_time: Time,
    technician_id: Uuid,
    client_id: Uuid,
    salon_id: Uuid,
    status: AgreementStatus,
    confirm_token_hash: Option<String>,
    expires_at: Option<OffsetDateTime>,
    confirmed_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    service_id: Uuid,
    service_name: String,
    duration_minutes: i32,
    max_participants: i32,
    client_name: String,
    client_email: String,
}

impl From<AgreementRow> for Agreement {
    fn from(row: AgreementRow) -> Self {
        Agreement {
            id: row.id,
            date: row.date,
            start_time: row.start_time,
            service: Service {
                id: row.service_id,
                name: row.service_name,
                duration_minutes: row.duration_minutes,
                max_participants: row.max_participants,
            },
            technician_id: row.technician_id,
            client_id: row.client_id,
            client_name: row.client_name,
            client_email: row.client_email,
            salon_id: row.salon_id,
            status: row.status,
            confirm_token_hash: row.confirm_token_hash,
            expires_at: row.expires_at,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
        }
    }
}

pub struct PgAgreementRepository {
    pool: PgPool,
}

impl PgAgreementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgreementRepository for PgAgreementRepository {
    async fn save(&self, agreement: &Agreement) -> Result<Uuid, DatabaseError> {
        if agreement.status == AgreementStatus::Pending
            && (agreement.confirm_token_hash.is_none() || agreement.expires_at.is_none())
        {
            return Err(DatabaseError::InvalidInput(
                "pending agreements must carry a token hash and expiry".into(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO agreements
                (id, date, start_time, service_id, technician_id, client_id, salon_id,
                 status, confirm_token_hash, expires_at, confirmed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(agreement.id)
        .bind(agreement.date)
        .bind(agreement.start_time)
        .bind(agreement.service.id)
        .bind(agreement.technician_id)
        .bind(agreement.client_id)
        .bind(agreement.salon_id)
        .bind(agreement.status)
        .bind(&agreement.confirm_token_hash)
        .bind(agreement.expires_at)
        .bind(agreement.confirmed_at)
        .bind(agreement.created_at)
        .execute(&self.pool)
        .await?;

        Ok(agreement.id)
    }

    async fn update(&self, agreement: &Agreement) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE agreements
            SET date = $2, start_time = $3, service_id = $4, status = $5,
                confirm_token_hash = $6, expires_at = $7, confirmed_at = $8
            WHERE id = $1
            "#,
        )
        .bind(agreement.id)
        .bind(agreement.date)
        .bind(agreement.start_time)
        .bind(agreement.service.id)
        .bind(agreement.status)
        .bind(&agreement.confirm_token_hash)
        .bind(agreement.expires_at)
        .bind(agreement.confirmed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Agreement>, DatabaseError> {
        let row = sqlx::query_as::<_, AgreementRow>(&format!("{SELECT_AGREEMENT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Agreement::from))
    }

    async fn get_active_for_technician_on_date(
        &self,
        date: Date,
        technician_id: Uuid,
    ) -> Result<Vec<Agreement>, DatabaseError> {
        let rows = sqlx::query_as::<_, AgreementRow>(&format!(
            "{SELECT_AGREEMENT} WHERE a.date = $1 AND a.technician_id = $2 \
             AND (a.status = 'pending' OR a.status = 'confirmed')"
        ))
        .bind(date)
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Agreement::from).collect())
    }

    async fn get_expired_pending(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<Agreement>, DatabaseError> {
        let rows = sqlx::query_as::<_, AgreementRow>(&format!(
            "{SELECT_AGREEMENT} WHERE a.status = 'pending' \
             AND a.expires_at IS NOT NULL AND a.expires_at < $1"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Agreement::from).collect())
    }

    async fn get_by_confirm_token_hash(
        &self,
        hash: &str,
    ) -> Result<Option<Agreement>, DatabaseError> {
        let row = sqlx::query_as::<_, AgreementRow>(&format!(
            "{SELECT_AGREEMENT} WHERE a.confirm_token_hash = $1"
        ))
        .bind(hash.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Agreement::from))
    }

    async fn confirm_if_pending(
        &self,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE agreements
            SET status = 'confirmed', confirmed_at = $2, expires_at = NULL
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE agreements SET status = 'cancelled' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}

use std::collections::HashMap;

use sqlx::PgPool;
use time::{Date, Time};
use uuid::Uuid;

use crate::db::models::{weekday_from_number, weekday_to_number, DayTimeRange, Schedule};
use crate::db::DatabaseError;

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    technician_id: Uuid,
    salon_id: Uuid,
    effective_start: Date,
    effective_end: Option<Date>,
    is_outage: bool,
    release_window_days: i32,
}

#[derive(sqlx::FromRow)]
struct RangeRow {
    schedule_id: Uuid,
    day_of_week: i16,
    begin_time: Time,
    end_time: Time,
}

impl RangeRow {
    fn into_range(self) -> Result<DayTimeRange, DatabaseError> {
        let day = weekday_from_number(self.day_of_week).ok_or_else(|| {
            DatabaseError::InvalidInput(format!("day_of_week out of range: {}", self.day_of_week))
        })?;
        Ok(DayTimeRange {
            day,
            begin_time: self.begin_time,
            end_time: self.end_time,
        })
    }
}

pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Schedule>, DatabaseError> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, technician_id, salon_id, effective_start, effective_end, \
             is_outage, release_window_days FROM schedules WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let ranges = self.ranges_for(&[row.id]).await?;
        Ok(Some(assemble(row, ranges)?))
    }

    pub async fn get_for_salon(&self, salon_id: Uuid) -> Result<Vec<Schedule>, DatabaseError> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, technician_id, salon_id, effective_start, effective_end, \
             is_outage, release_window_days FROM schedules WHERE salon_id = $1",
        )
        .bind(salon_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_ranges(rows).await
    }

    pub async fn get_for_technician(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<Schedule>, DatabaseError> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, technician_id, salon_id, effective_start, effective_end, \
             is_outage, release_window_days FROM schedules WHERE technician_id = $1",
        )
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_ranges(rows).await
    }

    async fn with_ranges(&self, rows: Vec<ScheduleRow>) -> Result<Vec<Schedule>, DatabaseError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut by_schedule: HashMap<Uuid, Vec<RangeRow>> = HashMap::new();
        for range in self.ranges_for(&ids).await? {
            by_schedule.entry(range.schedule_id).or_default().push(range);
        }

        rows.into_iter()
            .map(|row| {
                let ranges = by_schedule.remove(&row.id).unwrap_or_default();
                assemble(row, ranges)
            })
            .collect()
    }

    async fn ranges_for(&self, schedule_ids: &[Uuid]) -> Result<Vec<RangeRow>, DatabaseError> {
        if schedule_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, RangeRow>(
            "SELECT schedule_id, day_of_week, begin_time, end_time \
             FROM day_time_ranges WHERE schedule_id = ANY($1) \
             ORDER BY day_of_week, begin_time",
        )
        .bind(schedule_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, schedule: &Schedule) -> Result<Uuid, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO schedules \
             (id, technician_id, salon_id, effective_start, effective_end, is_outage, release_window_days) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(schedule.id)
        .bind(schedule.technician_id)
        .bind(schedule.salon_id)
        .bind(schedule.effective_start)
        .bind(schedule.effective_end)
        .bind(schedule.is_outage)
        .bind(schedule.release_window_days)
        .execute(&mut *tx)
        .await?;

        for range in &schedule.day_ranges {
            sqlx::query(
                "INSERT INTO day_time_ranges (schedule_id, day_of_week, begin_time, end_time) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(schedule.id)
            .bind(weekday_to_number(range.day))
            .bind(range.begin_time)
            .bind(range.end_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(schedule.id)
    }

    pub async fn update_fields(
        &self,
        id: Uuid,
        effective_start: Date,
        effective_end: Option<Date>,
        is_outage: bool,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE schedules SET effective_start = $2, effective_end = $3, is_outage = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(effective_start)
        .bind(effective_end)
        .bind(is_outage)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    pub async fn replace_time_ranges(
        &self,
        id: Uuid,
        ranges: &[DayTimeRange],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM day_time_ranges WHERE schedule_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for range in ranges {
            sqlx::query(
                "INSERT INTO day_time_ranges (schedule_id, day_of_week, begin_time, end_time) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(weekday_to_number(range.day))
            .bind(range.begin_time)
            .bind(range.end_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Soft-close: the rule stops producing slots after `today` but its rows
    /// stay for appointments already booked against it.
    pub async fn deactivate(&self, id: Uuid, today: Date) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE schedules SET effective_end = $2 WHERE id = $1")
            .bind(id)
            .bind(today)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}

fn assemble(row: ScheduleRow, ranges: Vec<RangeRow>) -> Result<Schedule, DatabaseError> {
    let day_ranges = ranges
        .into_iter()
        .map(RangeRow::into_range)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Schedule {
        id: row.id,
        technician_id: row.technician_id,
        salon_id: row.salon_id,
        effective_start: row.effective_start,
        effective_end: row.effective_end,
        is_outage: row.is_outage,
        day_ranges,
        release_window_days: row.release_window_days,
    })
}

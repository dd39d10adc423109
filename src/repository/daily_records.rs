//! Daily pickup records repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgExecutor, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{daily::DailyPickupRecord, enums::Period},
};

#[derive(Clone)]
pub struct DailyRecordsRepository {
    pool: Pool<Postgres>,
}

impl DailyRecordsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Find-or-create records for `booking_ids` on (date, period).
    ///
    /// Rows that already exist are left untouched; the unique key makes
    /// concurrent callers converge on a single row per booking.
    pub async fn ensure(
        &self,
        executor: impl PgExecutor<'_>,
        booking_ids: &[i32],
        date: NaiveDate,
        period: Period,
    ) -> AppResult<u64> {
        if booking_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO daily_pickup_records (booking_id, service_date, period)
            SELECT booking_id, $2, $3 FROM UNNEST($1::int4[]) AS t(booking_id)
            ON CONFLICT (booking_id, service_date, period) DO NOTHING
            "#,
        )
        .bind(booking_ids)
        .bind(date)
        .bind(period)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Records of `booking_ids` on (date, period)
    pub async fn find(
        &self,
        executor: impl PgExecutor<'_>,
        booking_ids: &[i32],
        date: NaiveDate,
        period: Period,
    ) -> AppResult<Vec<DailyPickupRecord>> {
        let records = sqlx::query_as::<_, DailyPickupRecord>(
            r#"
            SELECT * FROM daily_pickup_records
            WHERE booking_id = ANY($1) AND service_date = $2 AND period = $3
            ORDER BY booking_id
            "#,
        )
        .bind(booking_ids)
        .bind(date)
        .bind(period)
        .fetch_all(executor)
        .await?;
        Ok(records)
    }

    /// Complete the still-open records among `ids`. Returns only the rows
    /// changed by this call; already completed rows keep their timestamp.
    pub async fn complete_open(
        &self,
        executor: impl PgExecutor<'_>,
        ids: &[i64],
        now: DateTime<Utc>,
        driver_id: i32,
        notes: Option<&str>,
    ) -> AppResult<Vec<DailyPickupRecord>> {
        let records = sqlx::query_as::<_, DailyPickupRecord>(
            r#"
            UPDATE daily_pickup_records
            SET completed_at = $2, completed_by = $3, notes = COALESCE($4, notes)
            WHERE id = ANY($1) AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(ids)
        .bind(now)
        .bind(driver_id)
        .bind(notes)
        .fetch_all(executor)
        .await?;
        Ok(records)
    }

    /// Full history of a booking
    pub async fn list_for_booking(&self, booking_id: i32) -> AppResult<Vec<DailyPickupRecord>> {
        let records = sqlx::query_as::<_, DailyPickupRecord>(
            "SELECT * FROM daily_pickup_records WHERE booking_id = $1 ORDER BY service_date, period",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

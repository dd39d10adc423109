//! Route completions repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgExecutor, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{daily::RouteCompletion, enums::Period},
};

#[derive(Clone)]
pub struct RouteCompletionsRepository {
    pool: Pool<Postgres>,
}

impl RouteCompletionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn find(
        &self,
        route_id: i32,
        date: NaiveDate,
        period: Period,
    ) -> AppResult<Option<RouteCompletion>> {
        let completion = sqlx::query_as::<_, RouteCompletion>(
            r#"
            SELECT * FROM route_completions
            WHERE route_id = $1 AND service_date = $2 AND period = $3
            "#,
        )
        .bind(route_id)
        .bind(date)
        .bind(period)
        .fetch_optional(&self.pool)
        .await?;
        Ok(completion)
    }

    /// Record the completion unless one exists for the key.
    ///
    /// Returns `None` if another call already recorded it.
    pub async fn insert_once(
        &self,
        executor: impl PgExecutor<'_>,
        route_id: i32,
        date: NaiveDate,
        period: Period,
        completed_at: DateTime<Utc>,
        completed_by: Option<i32>,
        notes: Option<&str>,
    ) -> AppResult<Option<RouteCompletion>> {
        let completion = sqlx::query_as::<_, RouteCompletion>(
            r#"
            INSERT INTO route_completions (route_id, service_date, period, completed_at, completed_by, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (route_id, service_date, period) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(route_id)
        .bind(date)
        .bind(period)
        .bind(completed_at)
        .bind(completed_by)
        .bind(notes)
        .fetch_optional(executor)
        .await?;
        Ok(completion)
    }

    /// Attach review notes to a stored completion that has none yet.
    ///
    /// Completion time and driver are left as recorded.
    pub async fn record_review(
        &self,
        route_id: i32,
        date: NaiveDate,
        period: Period,
        notes: &str,
    ) -> AppResult<Option<RouteCompletion>> {
        let completion = sqlx::query_as::<_, RouteCompletion>(
            r#"
            UPDATE route_completions SET notes = $4
            WHERE route_id = $1 AND service_date = $2 AND period = $3 AND notes IS NULL
            RETURNING *
            "#,
        )
        .bind(route_id)
        .bind(date)
        .bind(period)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(completion)
    }
}

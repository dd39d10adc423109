//! Repository layer for database operations

pub mod bookings;
pub mod daily_records;
pub mod route_completions;
pub mod routes;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub bookings: bookings::BookingsRepository,
    pub routes: routes::RoutesRepository,
    pub daily_records: daily_records::DailyRecordsRepository,
    pub route_completions: route_completions::RouteCompletionsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            bookings: bookings::BookingsRepository::new(pool.clone()),
            routes: routes::RoutesRepository::new(pool.clone()),
            daily_records: daily_records::DailyRecordsRepository::new(pool.clone()),
            route_completions: route_completions::RouteCompletionsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Start a transaction for a multi-statement write
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Check database connectivity
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

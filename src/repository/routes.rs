//! Routes repository (routes, vehicle capacity, pickup points)

use sqlx::{PgConnection, PgExecutor, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::route::{PickupPoint, Route},
};

#[derive(Clone)]
pub struct RoutesRepository {
    pool: Pool<Postgres>,
}

impl RoutesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get route by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Route> {
        sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Route {} not found", id)))
    }

    /// Capacity of the vehicle currently assigned to the route
    pub async fn capacity(&self, executor: impl PgExecutor<'_>, route_id: i32) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            SELECT v.capacity
            FROM routes r
            JOIN vehicles v ON v.id = r.vehicle_id
            WHERE r.id = $1
            "#,
        )
        .bind(route_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route {} not found", route_id)))
    }

    /// Lock the route row for the rest of the transaction and read its capacity.
    ///
    /// Concurrent reservations on the same route queue on this lock, so each
    /// one counts seats only after the previous insert has committed.
    pub async fn lock_capacity(&self, conn: &mut PgConnection, route_id: i32) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            SELECT v.capacity
            FROM routes r
            JOIN vehicles v ON v.id = r.vehicle_id
            WHERE r.id = $1
            FOR UPDATE OF r
            "#,
        )
        .bind(route_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route {} not found", route_id)))
    }

    pub async fn get_pickup_point(&self, id: i32) -> AppResult<PickupPoint> {
        sqlx::query_as::<_, PickupPoint>("SELECT * FROM pickup_points WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pickup point {} not found", id)))
    }

    /// Pickup points in driving order (ties broken by id)
    pub async fn list_pickup_points(&self, route_id: i32) -> AppResult<Vec<PickupPoint>> {
        let points = sqlx::query_as::<_, PickupPoint>(
            "SELECT * FROM pickup_points WHERE route_id = $1 ORDER BY sequence_order, id",
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(points)
    }
}

//! Seat accounting per route.
//!
//! Seat usage is never cached: it is always counted from the bookings that
//! currently hold a seat (pending, awaiting approval, active). A reservation
//! is therefore the insert of a seat-holding booking, and a release is the
//! status change that moves a booking out of that set.

use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::route::RouteAvailability,
    repository::Repository,
};

/// Proof that a seat was free when the route lock was taken.
///
/// Only valid inside the transaction that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatReservation {
    pub route_id: i32,
    pub capacity: i32,
    pub seats_in_use: i64,
}

/// Audit record of a seat leaving the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatRelease {
    pub route_id: i32,
    pub booking_id: i32,
}

#[derive(Clone)]
pub struct CapacityService {
    repository: Repository,
}

impl CapacityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Current availability computed from live booking rows
    pub async fn availability(&self, route_id: i32) -> AppResult<RouteAvailability> {
        let pool = &self.repository.pool;
        let capacity = self.repository.routes.capacity(pool, route_id).await?;
        let seats_in_use = self.repository.bookings.count_seat_holding(pool, route_id).await?;

        tracing::debug!(route_id, capacity, seats_in_use, "Computed route availability");

        Ok(RouteAvailability {
            route_id,
            capacity,
            seats_in_use,
            available_seats: (i64::from(capacity) - seats_in_use).max(0),
        })
    }

    pub async fn available_seats(&self, route_id: i32) -> AppResult<i64> {
        Ok(self.availability(route_id).await?.available_seats)
    }

    /// Lock the route and confirm a seat is free.
    ///
    /// Must run inside the transaction that inserts the booking; the lock is
    /// held until that transaction ends.
    pub async fn reserve(&self, conn: &mut PgConnection, route_id: i32) -> AppResult<SeatReservation> {
        let capacity = self.repository.routes.lock_capacity(&mut *conn, route_id).await?;
        let seats_in_use = self
            .repository
            .bookings
            .count_seat_holding(&mut *conn, route_id)
            .await?;

        if seats_in_use >= i64::from(capacity) {
            tracing::warn!(route_id, capacity, seats_in_use, "Reservation rejected, route is full");
            return Err(AppError::CapacityExceeded { route_id });
        }

        Ok(SeatReservation {
            route_id,
            capacity,
            seats_in_use,
        })
    }

    /// Acknowledge that a booking stopped holding its seat.
    ///
    /// The status change already freed the seat; this only records it.
    pub fn release(&self, route_id: i32, booking_id: i32) -> SeatRelease {
        tracing::debug!(route_id, booking_id, "Seat released");
        SeatRelease { route_id, booking_id }
    }
}

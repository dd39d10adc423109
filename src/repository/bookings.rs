//! Bookings repository for database operations

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgExecutor, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingRow, PickupLocation, PricedBooking},
        enums::BookingStatus,
    },
};

const SEAT_HOLDING_STATUSES: &str = "status IN ('pending', 'awaiting_approval', 'active')";

fn into_bookings(rows: Vec<BookingRow>) -> AppResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get booking by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Booking> {
        sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))?
            .try_into()
    }

    /// Read a booking and block status changes until the transaction ends
    pub async fn get_for_share(&self, executor: impl PgExecutor<'_>, id: i32) -> AppResult<Booking> {
        sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1 FOR SHARE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))?
            .try_into()
    }

    /// Ids among `ids` that are still active, locked against status changes
    /// until the transaction ends
    pub async fn lock_active(&self, executor: impl PgExecutor<'_>, ids: &[i32]) -> AppResult<Vec<i32>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let locked = sqlx::query_scalar(
            "SELECT id FROM bookings WHERE id = ANY($1) AND status = 'active' ORDER BY id FOR SHARE",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(locked)
    }

    /// All bookings of a student, newest first
    pub async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE student_id = $1 ORDER BY start_date DESC, id DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        into_bookings(rows)
    }

    /// Seat-holding bookings of a student on a route whose dates overlap [start, end]
    pub async fn find_overlapping(
        &self,
        executor: impl PgExecutor<'_>,
        student_id: i32,
        route_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Booking>> {
        let query = format!(
            r#"
            SELECT * FROM bookings
            WHERE student_id = $1 AND route_id = $2
              AND start_date <= $4 AND end_date >= $3
              AND {}
            "#,
            SEAT_HOLDING_STATUSES
        );

        let rows = sqlx::query_as::<_, BookingRow>(&query)
            .bind(student_id)
            .bind(route_id)
            .bind(start)
            .bind(end)
            .fetch_all(executor)
            .await?;

        into_bookings(rows)
    }

    /// Count bookings currently holding a seat on a route
    pub async fn count_seat_holding(
        &self,
        executor: impl PgExecutor<'_>,
        route_id: i32,
    ) -> AppResult<i64> {
        let query = format!(
            "SELECT COUNT(*) FROM bookings WHERE route_id = $1 AND {}",
            SEAT_HOLDING_STATUSES
        );

        let count: i64 = sqlx::query_scalar(&query)
            .bind(route_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Insert a new pending booking
    pub async fn insert(
        &self,
        executor: impl PgExecutor<'_>,
        priced: &PricedBooking,
        now: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let booking = &priced.booking;
        let (pickup_point_id, address, latitude, longitude) = match &booking.pickup {
            PickupLocation::PickupPoint { pickup_point_id } => (Some(*pickup_point_id), None, None, None),
            PickupLocation::Address {
                address,
                latitude,
                longitude,
            } => (None, Some(address.as_str()), Some(*latitude), Some(*longitude)),
        };

        sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (
                student_id, booked_by, route_id,
                pickup_point_id, pickup_address, pickup_latitude, pickup_longitude,
                plan_type, trip_type, status, start_date, end_date, price,
                previous_booking_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11, $12, $13, $14, $14)
            RETURNING *
            "#,
        )
        .bind(booking.student_id)
        .bind(booking.booked_by)
        .bind(booking.route_id)
        .bind(pickup_point_id)
        .bind(address)
        .bind(latitude)
        .bind(longitude)
        .bind(booking.plan_type)
        .bind(booking.trip_type)
        .bind(booking.start_date)
        .bind(priced.end_date)
        .bind(priced.price)
        .bind(booking.previous_booking_id)
        .bind(now)
        .fetch_one(executor)
        .await?
        .try_into()
    }

    /// Move a booking to `to` if its current status is one of `from`.
    ///
    /// Returns `None` when the booking is missing or in another status; the
    /// conditional update makes each transition apply at most once.
    pub async fn transition(
        &self,
        executor: impl PgExecutor<'_>,
        id: i32,
        from: &[BookingStatus],
        to: BookingStatus,
        payment_reference: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Booking>> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();

        sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET status = $3,
                payment_reference = COALESCE($4, payment_reference),
                updated_at = $5
            WHERE id = $1 AND status::text = ANY($2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(payment_reference)
        .bind(now)
        .fetch_optional(executor)
        .await?
        .map(Booking::try_from)
        .transpose()
    }

    /// Expire every active booking whose end date is before `today`
    pub async fn expire_ended(&self, today: NaiveDate, now: DateTime<Utc>) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET status = 'expired', updated_at = $2
            WHERE status = 'active' AND end_date < $1
            RETURNING *
            "#,
        )
        .bind(today)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        into_bookings(rows)
    }

    /// Cancel pending bookings created before `cutoff`
    pub async fn cancel_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET status = 'cancelled', updated_at = $2
            WHERE status = 'pending' AND created_at < $1
            RETURNING *
            "#,
        )
        .bind(cutoff)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        into_bookings(rows)
    }

    /// Active bookings on a route whose range covers `date`
    pub async fn active_on(
        &self,
        executor: impl PgExecutor<'_>,
        route_id: i32,
        date: NaiveDate,
    ) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT * FROM bookings
            WHERE route_id = $1 AND status = 'active'
              AND start_date <= $2 AND end_date >= $2
            ORDER BY id
            "#,
        )
        .bind(route_id)
        .bind(date)
        .fetch_all(executor)
        .await?;

        into_bookings(rows)
    }

    /// Routes with at least one active booking covering `date`
    pub async fn routes_active_on(&self, date: NaiveDate) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT DISTINCT route_id FROM bookings
            WHERE status = 'active' AND start_date <= $1 AND end_date >= $1
            ORDER BY route_id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

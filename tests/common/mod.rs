//! Fixtures shared by the database-backed tests

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use std::sync::Arc;

use schoolride_server::{
    clock::FixedClock,
    config::AppConfig,
    models::{
        booking::{Booking, NewBooking, PickupLocation},
        enums::{PlanType, ServiceType, TripType},
    },
    repository::Repository,
    services::Services,
};

/// Friday 2024-03-01, a service day
pub fn service_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct Harness {
    pub pool: PgPool,
    pub clock: Arc<FixedClock>,
    pub services: Services,
}

pub fn harness(pool: PgPool) -> Harness {
    harness_with(pool, AppConfig::default())
}

pub fn harness_with(pool: PgPool, config: AppConfig) -> Harness {
    let clock = Arc::new(FixedClock::on(service_day()));
    let services = Services::new(Repository::new(pool.clone()), &config, clock.clone());
    Harness { pool, clock, services }
}

/// Insert a vehicle and a route using it
pub async fn seed_route(pool: &PgPool, capacity: i32, service_type: ServiceType) -> i32 {
    let vehicle_id: i32 = sqlx::query_scalar(
        "INSERT INTO vehicles (registration, capacity) VALUES ('BUS-' || substr(md5(random()::text), 1, 12), $1) RETURNING id",
    )
    .bind(capacity)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar(
        "INSERT INTO routes (name, vehicle_id, driver_id, service_type) VALUES ('Route', $1, 900, $2) RETURNING id",
    )
    .bind(vehicle_id)
    .bind(service_type)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_point(pool: &PgPool, route_id: i32, sequence_order: i32) -> i32 {
    seed_point_with_times(
        pool,
        route_id,
        sequence_order,
        NaiveTime::from_hms_opt(7, 30, 0),
        NaiveTime::from_hms_opt(15, 30, 0),
    )
    .await
}

pub async fn seed_point_with_times(
    pool: &PgPool,
    route_id: i32,
    sequence_order: i32,
    pickup_time: Option<NaiveTime>,
    dropoff_time: Option<NaiveTime>,
) -> i32 {
    sqlx::query_scalar(
        r#"
        INSERT INTO pickup_points (route_id, name, sequence_order, pickup_time, dropoff_time)
        VALUES ($1, 'Stop', $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(route_id)
    .bind(sequence_order)
    .bind(pickup_time)
    .bind(dropoff_time)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub fn new_booking(student_id: i32, route_id: i32, pickup_point_id: i32) -> NewBooking {
    NewBooking {
        student_id,
        booked_by: Some(500 + student_id),
        route_id,
        pickup: PickupLocation::PickupPoint { pickup_point_id },
        plan_type: PlanType::Monthly,
        trip_type: TripType::TwoWay,
        start_date: service_day(),
        previous_booking_id: None,
    }
}

/// Create and pay a booking so it is active from the service day
pub async fn active_booking(h: &Harness, student_id: i32, route_id: i32, pickup_point_id: i32) -> Booking {
    let booking = h
        .services
        .bookings
        .create(new_booking(student_id, route_id, pickup_point_id))
        .await
        .unwrap();
    h.services
        .bookings
        .record_payment_result(booking.id, true, &format!("pay_{}", booking.id))
        .await
        .unwrap()
}

pub async fn count_bookings(pool: &PgPool, route_id: i32) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE route_id = $1")
        .bind(route_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

//! Booking state machine and capacity tests against Postgres.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

mod common;

use chrono::Duration;
use rust_decimal::Decimal;
use sqlx::PgPool;

use common::*;
use schoolride_server::{
    config::AppConfig,
    error::AppError,
    models::{
        booking::{PickupLocation, RebookRequest},
        enums::{BookingStatus, PlanType, ServiceType, TripType},
    },
};

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn new_booking_is_pending_and_priced(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 4, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let booking = h.services.bookings.create(new_booking(1, route, point)).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.start_date, date(2024, 3, 1));
    assert_eq!(booking.end_date, date(2024, 4, 1));
    // 45.00 default rate * 3.60 monthly
    assert_eq!(booking.price, Decimal::new(16200, 2));
    assert_eq!(h.services.capacity.available_seats(route).await.unwrap(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn seat_count_never_exceeds_capacity(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 2, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    for student in 1..=2 {
        h.services.bookings.create(new_booking(student, route, point)).await.unwrap();
    }
    assert_eq!(h.services.capacity.available_seats(route).await.unwrap(), 0);

    let err = h.services.bookings.create(new_booking(3, route, point)).await.unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded { route_id } if route_id == route));
    assert_eq!(count_bookings(&h.pool, route).await, 2);

    let availability = h.services.capacity.availability(route).await.unwrap();
    assert_eq!(availability.seats_in_use, 2);
    assert_eq!(availability.capacity, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn only_one_of_two_concurrent_bookings_gets_the_last_seat(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 1, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let first = h.services.bookings.clone();
    let second = h.services.bookings.clone();
    let (a, b) = tokio::join!(
        first.create(new_booking(1, route, point)),
        second.create(new_booking(2, route, point)),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AppError::CapacityExceeded { .. }))));
    assert_eq!(count_bookings(&h.pool, route).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn cancelled_booking_frees_its_seat(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 1, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let booking = h.services.bookings.create(new_booking(1, route, point)).await.unwrap();
    let cancelled = h.services.bookings.cancel(booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    tokio_test::assert_ok!(h.services.bookings.create(new_booking(2, route, point)).await);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn overlapping_booking_for_same_student_is_rejected(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 5, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    h.services.bookings.create(new_booking(1, route, point)).await.unwrap();

    let mut again = new_booking(1, route, point);
    again.start_date = date(2024, 3, 15);
    again.plan_type = PlanType::Weekly;
    let err = h.services.bookings.create(again).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateActiveBooking { student_id: 1, .. }));

    // A booking starting after the first one ends is fine
    let mut later = new_booking(1, route, point);
    later.start_date = date(2024, 4, 2);
    tokio_test::assert_ok!(h.services.bookings.create(later).await);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn pickup_point_of_another_route_is_rejected(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 5, ServiceType::Both).await;
    let other = seed_route(&h.pool, 5, ServiceType::Both).await;
    let foreign_point = seed_point(&h.pool, other, 1).await;

    let err = h
        .services
        .bookings
        .create(new_booking(1, route, foreign_point))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(count_bookings(&h.pool, route).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn address_pickup_is_stored_as_address(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 5, ServiceType::Both).await;

    let mut booking = new_booking(1, route, 0);
    booking.pickup = PickupLocation::Address {
        address: "4 Orchard Lane".to_string(),
        latitude: 48.85,
        longitude: 2.35,
    };
    booking.trip_type = TripType::OneWay;

    let created = h.services.bookings.create(booking).await.unwrap();
    assert_eq!(created.pickup.pickup_point_id(), None);
    // one-way at 0.60 of 162.00
    assert_eq!(created.price, Decimal::new(9720, 2));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn successful_payment_activates_booking(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 5, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;
    let mut events = h.services.events.subscribe();

    let booking = h.services.bookings.create(new_booking(1, route, point)).await.unwrap();
    let paid = h
        .services
        .bookings
        .record_payment_result(booking.id, true, "pay_abc")
        .await
        .unwrap();

    assert_eq!(paid.status, BookingStatus::Active);
    assert_eq!(paid.payment_reference.as_deref(), Some("pay_abc"));
    assert_eq!(events.recv().await.unwrap().kind.name(), "booking_created");
    assert_eq!(events.recv().await.unwrap().kind.name(), "payment_received");

    // The same result delivered twice does not apply twice
    let err = h
        .services
        .bookings
        .record_payment_result(booking.id, true, "pay_abc")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidStateTransition { status: BookingStatus::Active, .. }
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn failed_payment_cancels_and_releases(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 1, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let booking = h.services.bookings.create(new_booking(1, route, point)).await.unwrap();
    let failed = h
        .services
        .bookings
        .record_payment_result(booking.id, false, "pay_declined")
        .await
        .unwrap();

    assert_eq!(failed.status, BookingStatus::Cancelled);
    assert_eq!(h.services.capacity.available_seats(route).await.unwrap(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn approval_policy_parks_paid_bookings(pool: PgPool) {
    let mut config = AppConfig::default();
    config.bookings.require_admin_approval = true;
    let h = harness_with(pool, config);
    let route = seed_route(&h.pool, 2, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let first = h.services.bookings.create(new_booking(1, route, point)).await.unwrap();
    let second = h.services.bookings.create(new_booking(2, route, point)).await.unwrap();

    let paid = h.services.bookings.record_payment_result(first.id, true, "p1").await.unwrap();
    assert_eq!(paid.status, BookingStatus::AwaitingApproval);
    assert_eq!(h.services.capacity.available_seats(route).await.unwrap(), 0);

    let approved = h.services.bookings.approve(first.id).await.unwrap();
    assert_eq!(approved.status, BookingStatus::Active);

    // Approval is only valid from awaiting_approval
    let err = h.services.bookings.approve(second.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidStateTransition { status: BookingStatus::Pending, .. }
    ));

    h.services.bookings.record_payment_result(second.id, true, "p2").await.unwrap();
    let rejected = h.services.bookings.reject(second.id).await.unwrap();
    assert_eq!(rejected.status, BookingStatus::Cancelled);
    assert_eq!(h.services.capacity.available_seats(route).await.unwrap(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn cancelled_booking_cannot_be_cancelled_again(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 2, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let booking = active_booking(&h, 1, route, point).await;
    h.services.bookings.cancel(booking.id).await.unwrap();

    let err = h.services.bookings.cancel(booking.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidStateTransition { status: BookingStatus::Cancelled, .. }
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn expire_due_is_idempotent(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 3, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let mut weekly = new_booking(1, route, point);
    weekly.plan_type = PlanType::Weekly;
    let booking = h.services.bookings.create(weekly).await.unwrap();
    h.services.bookings.record_payment_result(booking.id, true, "p").await.unwrap();
    let monthly = active_booking(&h, 2, route, point).await;

    // Still active on its end date
    h.clock.set(date(2024, 3, 8).and_hms_opt(12, 0, 0).unwrap().and_utc());
    assert!(h.services.bookings.expire_due().await.unwrap().is_empty());

    h.clock.advance(Duration::days(1));
    let expired = h.services.bookings.expire_due().await.unwrap();
    assert_eq!(expired.iter().map(|b| b.id).collect::<Vec<_>>(), vec![booking.id]);
    assert!(h.services.bookings.expire_due().await.unwrap().is_empty());

    assert_eq!(h.services.bookings.get(booking.id).await.unwrap().status, BookingStatus::Expired);
    assert_eq!(h.services.bookings.get(monthly.id).await.unwrap().status, BookingStatus::Active);
    assert_eq!(h.services.capacity.available_seats(route).await.unwrap(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn stale_pending_holds_are_cancelled(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 2, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let booking = h.services.bookings.create(new_booking(1, route, point)).await.unwrap();

    h.clock.advance(Duration::minutes(30));
    assert!(h.services.bookings.cancel_stale_pending().await.unwrap().is_empty());

    h.clock.advance(Duration::minutes(31));
    let cancelled = h.services.bookings.cancel_stale_pending().await.unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, booking.id);
    assert!(h.services.bookings.cancel_stale_pending().await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn completion_waits_for_end_date(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 2, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;
    let booking = active_booking(&h, 1, route, point).await;

    let err = h.services.bookings.complete(booking.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    h.clock.set(booking.end_date.and_hms_opt(18, 0, 0).unwrap().and_utc());
    let completed = h.services.bookings.complete(booking.id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(h.services.capacity.available_seats(route).await.unwrap(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn rebook_creates_a_linked_booking_and_keeps_the_old_one(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 3, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;
    let original = active_booking(&h, 1, route, point).await;

    h.clock.set(date(2024, 4, 2).and_hms_opt(8, 0, 0).unwrap().and_utc());
    h.services.bookings.expire_due().await.unwrap();

    let rebooked = h
        .services
        .bookings
        .rebook(
            original.id,
            RebookRequest {
                start_date: date(2024, 4, 8),
                plan_type: Some("term".to_string()),
                trip_type: None,
                pickup_point_id: None,
                address: None,
            },
            None,
        )
        .await
        .unwrap();

    assert_ne!(rebooked.id, original.id);
    assert_eq!(rebooked.previous_booking_id, Some(original.id));
    assert_eq!(rebooked.plan_type, PlanType::Term);
    assert_eq!(rebooked.pickup, original.pickup);
    assert_eq!(rebooked.booked_by, original.booked_by);
    assert_eq!(rebooked.status, BookingStatus::Pending);

    let old = h.services.bookings.get(original.id).await.unwrap();
    assert_eq!(old.status, BookingStatus::Expired);
    assert_eq!(old.end_date, original.end_date);

    let history = h.services.bookings.history(rebooked.id).await.unwrap();
    assert_eq!(history.iter().map(|b| b.id).collect::<Vec<_>>(), vec![rebooked.id, original.id]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn past_start_date_is_rejected(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 3, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;

    let mut booking = new_booking(1, route, point);
    booking.start_date = date(2024, 2, 28);
    assert!(matches!(
        h.services.bookings.create(booking).await,
        Err(AppError::Validation(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn booked_dates_are_immutable_in_storage(pool: PgPool) {
    let h = harness(pool);
    let route = seed_route(&h.pool, 3, ServiceType::Both).await;
    let point = seed_point(&h.pool, route, 1).await;
    let booking = h.services.bookings.create(new_booking(1, route, point)).await.unwrap();

    let result = sqlx::query("UPDATE bookings SET end_date = end_date + 1 WHERE id = $1")
        .bind(booking.id)
        .execute(&h.pool)
        .await;
    assert!(result.is_err());
}

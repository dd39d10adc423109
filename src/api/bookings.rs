//! Booking endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        booking::{Booking, CreateBookingRequest, PaymentResultRequest, RebookRequest},
        daily::DailyPickupRecord,
        user::Role,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Create a booking
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created in pending status", body = Booking),
        (status = 400, description = "Invalid request or plan type", body = crate::error::ErrorResponse),
        (status = 404, description = "Route or pickup point not found"),
        (status = 409, description = "Route full or overlapping booking", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let booking = state
        .services
        .bookings
        .create_from_request(request, Some(claims.user_id))
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Get booking by ID
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = Booking),
        (status = 403, description = "Not your booking"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.get(id).await?;
    claims.require_booking_access(booking.booked_by)?;
    Ok(Json(booking))
}

/// Booking and the bookings it was rebooked from, newest first
#[utoipa::path(
    get,
    path = "/bookings/{id}/history",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Rebooking chain", body = Vec<Booking>),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Booking>>> {
    let history = state.services.bookings.history(id).await?;
    if let Some(booking) = history.first() {
        claims.require_booking_access(booking.booked_by)?;
    }
    Ok(Json(history))
}

/// Bookings of a student
#[utoipa::path(
    get,
    path = "/students/{id}/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student's bookings, newest first", body = Vec<Booking>)
    )
)]
pub async fn list_student_bookings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(student_id): Path<i32>,
) -> AppResult<Json<Vec<Booking>>> {
    let mut bookings = state.services.bookings.list_for_student(student_id).await?;
    if claims.role == Role::Parent {
        bookings.retain(|b| b.booked_by == Some(claims.user_id));
    }
    Ok(Json(bookings))
}

/// Rebook from a previous booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/rebook",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Previous booking ID")),
    request_body = RebookRequest,
    responses(
        (status = 201, description = "New booking created", body = Booking),
        (status = 404, description = "Previous booking not found"),
        (status = 409, description = "Route full or overlapping booking")
    )
)]
pub async fn rebook(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<RebookRequest>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let previous = state.services.bookings.get(id).await?;
    claims.require_booking_access(previous.booked_by)?;

    let booking = state
        .services
        .bookings
        .rebook(id, request, Some(claims.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Record the payment gateway result
#[utoipa::path(
    post,
    path = "/bookings/{id}/payment-result",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body = PaymentResultRequest,
    responses(
        (status = 200, description = "Booking after payment", body = Booking),
        (status = 409, description = "Booking is not pending")
    )
)]
pub async fn record_payment_result(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<PaymentResultRequest>,
) -> AppResult<Json<Booking>> {
    claims.require_admin()?;

    let booking = state
        .services
        .bookings
        .record_payment_result(id, request.success, &request.correlation_id)
        .await?;
    Ok(Json(booking))
}

/// Approve a paid booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/approve",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking activated", body = Booking),
        (status = 409, description = "Booking is not awaiting approval")
    )
)]
pub async fn approve_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    claims.require_admin()?;
    Ok(Json(state.services.bookings.approve(id).await?))
}

/// Reject a paid booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/reject",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 409, description = "Booking is not awaiting approval")
    )
)]
pub async fn reject_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    claims.require_admin()?;
    Ok(Json(state.services.bookings.reject(id).await?))
}

/// Cancel a booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 403, description = "Not your booking"),
        (status = 409, description = "Booking already ended")
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.get(id).await?;
    claims.require_booking_access(booking.booked_by)?;
    Ok(Json(state.services.bookings.cancel(id).await?))
}

/// Close a booking that reached its end date
#[utoipa::path(
    post,
    path = "/bookings/{id}/complete",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking completed", body = Booking),
        (status = 400, description = "End date not reached"),
        (status = 409, description = "Booking is not active")
    )
)]
pub async fn complete_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    claims.require_admin()?;
    Ok(Json(state.services.bookings.complete(id).await?))
}

/// Daily pickup records of a booking
#[utoipa::path(
    get,
    path = "/bookings/{id}/records",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Pickup records by date", body = Vec<DailyPickupRecord>)
    )
)]
pub async fn list_booking_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<DailyPickupRecord>>> {
    let booking = state.services.bookings.get(id).await?;
    claims.require_booking_access(booking.booked_by)?;
    Ok(Json(state.services.tracker.booking_records(id).await?))
}

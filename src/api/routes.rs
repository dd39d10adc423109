//! Route availability, rosters and pickup marking

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        daily::{DailyPickupRecord, MarkBookingRequest, MarkPickupPointRequest, Roster, ServiceDayQuery},
        route::{PickupPoint, RouteAvailability},
    },
    AppState,
};

use super::{service_date, AuthenticatedUser};

/// Seats left on a route
#[utoipa::path(
    get,
    path = "/routes/{id}/availability",
    tag = "routes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Live seat count", body = RouteAvailability),
        (status = 404, description = "Route not found")
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(route_id): Path<i32>,
) -> AppResult<Json<RouteAvailability>> {
    Ok(Json(state.services.capacity.availability(route_id).await?))
}

/// Pickup points of a route in driving order
#[utoipa::path(
    get,
    path = "/routes/{id}/pickup-points",
    tag = "routes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Ordered pickup points", body = Vec<PickupPoint>)
    )
)]
pub async fn list_pickup_points(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(route_id): Path<i32>,
) -> AppResult<Json<Vec<PickupPoint>>> {
    state.services.repository.routes.get_by_id(route_id).await?;
    Ok(Json(state.services.repository.routes.list_pickup_points(route_id).await?))
}

/// Driver roster for a date and period
#[utoipa::path(
    get,
    path = "/routes/{id}/roster",
    tag = "routes",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Route ID"),
        ServiceDayQuery
    ),
    responses(
        (status = 200, description = "Expected pickups with their records", body = Roster),
        (status = 403, description = "Driver rights required")
    )
)]
pub async fn get_roster(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(route_id): Path<i32>,
    Query(query): Query<ServiceDayQuery>,
) -> AppResult<Json<Roster>> {
    claims.require_driver()?;

    let date = service_date(&state, query.date);
    Ok(Json(state.services.tracker.roster_for(route_id, date, query.period).await?))
}

/// Mark every booking at a pickup point as picked up
#[utoipa::path(
    post,
    path = "/routes/{id}/pickup-points/{pickup_point_id}/complete",
    tag = "routes",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Route ID"),
        ("pickup_point_id" = i32, Path, description = "Pickup point ID")
    ),
    request_body = MarkPickupPointRequest,
    responses(
        (status = 200, description = "Records of the point's bookings", body = Vec<DailyPickupRecord>),
        (status = 400, description = "Pickup point not on this route")
    )
)]
pub async fn mark_pickup_point_complete(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((route_id, pickup_point_id)): Path<(i32, i32)>,
    Json(request): Json<MarkPickupPointRequest>,
) -> AppResult<Json<Vec<DailyPickupRecord>>> {
    claims.require_driver()?;

    let date = service_date(&state, request.date);
    let records = state
        .services
        .tracker
        .mark_pickup_point_complete(pickup_point_id, route_id, date, request.period, claims.user_id)
        .await?;
    Ok(Json(records))
}

/// Mark a single booking as picked up
#[utoipa::path(
    post,
    path = "/bookings/{id}/pickup",
    tag = "routes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body = MarkBookingRequest,
    responses(
        (status = 200, description = "Pickup record", body = DailyPickupRecord),
        (status = 422, description = "Booking not active for this date and period", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_booking_complete(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(booking_id): Path<i32>,
    Json(request): Json<MarkBookingRequest>,
) -> AppResult<Json<DailyPickupRecord>> {
    claims.require_driver()?;

    let date = service_date(&state, request.date);
    let record = state
        .services
        .tracker
        .mark_booking_complete(booking_id, date, request.period, claims.user_id, request.notes.as_deref())
        .await?;
    Ok(Json(record))
}

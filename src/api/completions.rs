//! Route completion endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::daily::{CompleteRouteRequest, RouteCompletion, RouteCompletionStatus, ServiceDayQuery},
    AppState,
};

use super::{service_date, AuthenticatedUser};

/// Completion state of a route trip
#[utoipa::path(
    get,
    path = "/routes/{id}/completion",
    tag = "completions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Route ID"),
        ServiceDayQuery
    ),
    responses(
        (status = 200, description = "Coverage and stored completion", body = RouteCompletionStatus)
    )
)]
pub async fn get_completion(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(route_id): Path<i32>,
    Query(query): Query<ServiceDayQuery>,
) -> AppResult<Json<RouteCompletionStatus>> {
    claims.require_driver()?;

    let date = service_date(&state, query.date);
    Ok(Json(state.services.completions.status(route_id, date, query.period).await?))
}

/// Close a route trip once every pickup is done
#[utoipa::path(
    post,
    path = "/routes/{id}/completion",
    tag = "completions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Route ID")),
    request_body = CompleteRouteRequest,
    responses(
        (status = 200, description = "Route completion", body = RouteCompletion),
        (status = 409, description = "Pickups still open")
    )
)]
pub async fn complete_route(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(route_id): Path<i32>,
    Json(request): Json<CompleteRouteRequest>,
) -> AppResult<Json<RouteCompletion>> {
    claims.require_driver()?;

    let date = service_date(&state, request.date);
    let completion = state
        .services
        .completions
        .complete_route(route_id, date, request.period, request.notes.as_deref())
        .await?;
    Ok(Json(completion))
}

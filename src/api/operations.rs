//! Batch triggers for the daily jobs

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::booking::Booking,
    services::operations::SweepReport,
    AppState,
};

use super::{service_date, AuthenticatedUser};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RosterGenerationQuery {
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct RosterGenerationResponse {
    pub date: NaiveDate,
    /// Records created by this run
    pub created: u64,
}

/// Expire bookings that ended before today
#[utoipa::path(
    post,
    path = "/operations/expire",
    tag = "operations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bookings expired by this run", body = Vec<Booking>)
    )
)]
pub async fn expire_due(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Booking>>> {
    claims.require_admin()?;
    Ok(Json(state.services.bookings.expire_due().await?))
}

/// Materialize pickup records for a day
#[utoipa::path(
    post,
    path = "/operations/rosters",
    tag = "operations",
    security(("bearer_auth" = [])),
    params(RosterGenerationQuery),
    responses(
        (status = 200, description = "Records created", body = RosterGenerationResponse)
    )
)]
pub async fn generate_rosters(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RosterGenerationQuery>,
) -> AppResult<Json<RosterGenerationResponse>> {
    claims.require_admin()?;

    let date = service_date(&state, query.date);
    let created = state.services.tracker.generate_rosters(date).await?;
    Ok(Json(RosterGenerationResponse { date, created }))
}

/// Run the full daily sweep now
#[utoipa::path(
    post,
    path = "/operations/sweep",
    tag = "operations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep summary", body = SweepReport)
    )
)]
pub async fn run_sweep(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepReport>> {
    claims.require_admin()?;
    Ok(Json(state.services.operations.sweep().await?))
}

//! Daily pickup records, route completions and rosters

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::booking::Booking;
use super::enums::Period;
use super::route::PickupPoint;

/// One row per (booking, service date, period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DailyPickupRecord {
    pub id: i64,
    pub booking_id: i32,
    pub service_date: NaiveDate,
    pub period: Period,
    pub completed_at: Option<DateTime<Utc>>,
    /// Driver who marked the pickup
    pub completed_by: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DailyPickupRecord {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Historical fact that a route finished a period on a date
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RouteCompletion {
    pub id: i64,
    pub route_id: i32,
    pub service_date: NaiveDate,
    pub period: Period,
    pub completed_at: DateTime<Utc>,
    pub completed_by: Option<i32>,
    pub notes: Option<String>,
}

/// A booking expected on a route for a date/period, with its record
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterEntry {
    pub booking: Booking,
    /// None for door-to-door address pickups
    pub pickup_point: Option<PickupPoint>,
    pub record: DailyPickupRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Roster {
    pub route_id: i32,
    pub service_date: NaiveDate,
    pub period: Period,
    pub entries: Vec<RosterEntry>,
}

/// Completion state for a (route, date, period) key
#[derive(Debug, Serialize, ToSchema)]
pub struct RouteCompletionStatus {
    pub route_id: i32,
    pub service_date: NaiveDate,
    pub period: Period,
    pub expected: usize,
    pub completed: usize,
    pub can_complete: bool,
    pub completion: Option<RouteCompletion>,
}

/// Query selecting a service day and period
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ServiceDayQuery {
    /// Service date (YYYY-MM-DD), defaults to today
    pub date: Option<NaiveDate>,
    pub period: Period,
}

/// Mark a pickup point done
#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkPickupPointRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    /// Restrict marking to one period; all periods served today otherwise
    pub period: Option<Period>,
}

/// Mark a single booking done
#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkBookingRequest {
    pub date: Option<NaiveDate>,
    pub period: Period,
    pub notes: Option<String>,
}

/// Driver's explicit request to close a route trip
#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteRouteRequest {
    pub date: Option<NaiveDate>,
    pub period: Period,
    /// Free-text review of the trip
    pub notes: Option<String>,
}

/// Completed share of the bookings expected for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub expected: usize,
    pub completed: usize,
}

impl Coverage {
    /// Count completed records against the number of expected bookings.
    /// Bookings without a record yet count as open.
    pub fn of(expected: usize, records: &[DailyPickupRecord]) -> Self {
        let completed = records.iter().filter(|r| r.is_completed()).count().min(expected);
        Self { expected, completed }
    }

    /// A key is complete when something was expected and all of it is done
    pub fn is_complete(&self) -> bool {
        self.expected > 0 && self.completed == self.expected
    }
}

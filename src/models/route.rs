//! Route and pickup point models (maintained by the fleet admin, read here)

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{Period, ServiceType, TripType};

/// A vehicle and driver pairing serving an ordered list of pickup points
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Route {
    pub id: i32,
    pub name: String,
    pub vehicle_id: i32,
    pub driver_id: Option<i32>,
    pub service_type: ServiceType,
    /// Route specific base rate; the configured default applies when absent
    pub base_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PickupPoint {
    pub id: i32,
    pub route_id: i32,
    pub name: String,
    pub sequence_order: i32,
    /// Scheduled morning pickup
    pub pickup_time: Option<NaiveTime>,
    /// Scheduled afternoon dropoff
    pub dropoff_time: Option<NaiveTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PickupPoint {
    /// Whether this point is scheduled for `period`.
    ///
    /// A point without any scheduled time follows its route.
    pub fn schedules(&self, period: Period) -> bool {
        match (self.pickup_time, self.dropoff_time) {
            (None, None) => true,
            (pickup, dropoff) => match period {
                Period::Am => pickup.is_some(),
                Period::Pm => dropoff.is_some(),
            },
        }
    }
}

/// Whether a booking with `trip_type` at `pickup_point` rides `period` on `route`
pub fn period_applies(
    route: &Route,
    pickup_point: Option<&PickupPoint>,
    trip_type: TripType,
    period: Period,
) -> bool {
    route.service_type.serves(period)
        && trip_type.rides(period)
        && pickup_point.map_or(true, |point| point.schedules(period))
}

/// Seat availability on a route
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RouteAvailability {
    pub route_id: i32,
    pub capacity: i32,
    pub seats_in_use: i64,
    pub available_seats: i64,
}

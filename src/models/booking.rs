//! Booking model and related types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{BookingStatus, PlanType, TripType};
use crate::error::AppError;

/// Where the student is picked up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PickupLocation {
    /// One of the route's scheduled pickup points
    PickupPoint { pickup_point_id: i32 },
    /// A door-to-door address outside the scheduled points
    Address {
        address: String,
        latitude: f64,
        longitude: f64,
    },
}

impl PickupLocation {
    pub fn pickup_point_id(&self) -> Option<i32> {
        match self {
            PickupLocation::PickupPoint { pickup_point_id } => Some(*pickup_point_id),
            PickupLocation::Address { .. } => None,
        }
    }
}

/// Booking row as stored in database
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: i32,
    pub student_id: i32,
    pub booked_by: Option<i32>,
    pub route_id: i32,
    pub pickup_point_id: Option<i32>,
    pub pickup_address: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub plan_type: PlanType,
    pub trip_type: TripType,
    pub status: BookingStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: Decimal,
    pub payment_reference: Option<String>,
    pub previous_booking_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One student's subscription to one route for a date range
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: i32,
    pub student_id: i32,
    pub booked_by: Option<i32>,
    pub route_id: i32,
    pub pickup: PickupLocation,
    pub plan_type: PlanType,
    pub trip_type: TripType,
    pub status: BookingStatus,
    pub start_date: NaiveDate,
    /// Last service day included in the plan
    pub end_date: NaiveDate,
    pub price: Decimal,
    pub payment_reference: Option<String>,
    /// Booking this one was rebooked from (lookup only)
    pub previous_booking_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Whether `date` falls inside the booked [start, end] range
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let pickup = match (row.pickup_point_id, row.pickup_address) {
            (Some(pickup_point_id), None) => PickupLocation::PickupPoint { pickup_point_id },
            (None, Some(address)) => PickupLocation::Address {
                address,
                latitude: row.pickup_latitude.unwrap_or_default(),
                longitude: row.pickup_longitude.unwrap_or_default(),
            },
            _ => {
                return Err(AppError::Internal(format!(
                    "Booking {} must have exactly one pickup location",
                    row.id
                )))
            }
        };

        Ok(Booking {
            id: row.id,
            student_id: row.student_id,
            booked_by: row.booked_by,
            route_id: row.route_id,
            pickup,
            plan_type: row.plan_type,
            trip_type: row.trip_type,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            price: row.price,
            payment_reference: row.payment_reference,
            previous_booking_id: row.previous_booking_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input to the booking state machine's `create`
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_id: i32,
    pub booked_by: Option<i32>,
    pub route_id: i32,
    pub pickup: PickupLocation,
    pub plan_type: PlanType,
    pub trip_type: TripType,
    pub start_date: NaiveDate,
    pub previous_booking_id: Option<i32>,
}

/// Fully priced booking ready for insertion
#[derive(Debug, Clone)]
pub struct PricedBooking {
    pub booking: NewBooking,
    pub end_date: NaiveDate,
    pub price: Decimal,
}

/// Free-form address pickup in a request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddressPickup {
    #[validate(length(min = 3, max = 500))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Create booking request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub student_id: i32,
    pub route_id: i32,
    /// Scheduled pickup point (exclusive with `address`)
    pub pickup_point_id: Option<i32>,
    /// Door-to-door address (exclusive with `pickup_point_id`)
    #[validate(nested)]
    pub address: Option<AddressPickup>,
    /// weekly, bi_weekly, monthly, term or annual
    pub plan_type: String,
    pub trip_type: TripType,
    pub start_date: NaiveDate,
}

/// Rebook request; omitted fields are copied from the previous booking
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RebookRequest {
    pub start_date: NaiveDate,
    pub plan_type: Option<String>,
    pub trip_type: Option<TripType>,
    pub pickup_point_id: Option<i32>,
    #[validate(nested)]
    pub address: Option<AddressPickup>,
}

/// Turn the two optional request fields into a tagged location.
///
/// Returns `Ok(None)` when neither is given.
pub fn pickup_from_request(
    pickup_point_id: Option<i32>,
    address: Option<AddressPickup>,
) -> Result<Option<PickupLocation>, AppError> {
    match (pickup_point_id, address) {
        (Some(pickup_point_id), None) => Ok(Some(PickupLocation::PickupPoint { pickup_point_id })),
        (None, Some(a)) => Ok(Some(PickupLocation::Address {
            address: a.address,
            latitude: a.latitude,
            longitude: a.longitude,
        })),
        (None, None) => Ok(None),
        (Some(_), Some(_)) => Err(AppError::Validation(
            "Provide either pickup_point_id or address, not both".to_string(),
        )),
    }
}

/// Payment gateway result
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentResultRequest {
    pub success: bool,
    /// Gateway correlation id
    pub correlation_id: String,
}

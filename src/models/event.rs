//! Domain events forwarded to the notification subsystem

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::{BookingStatus, Period};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEventKind {
    BookingCreated {
        booking_id: i32,
        student_id: i32,
        route_id: i32,
    },
    BookingCancelled {
        booking_id: i32,
        route_id: i32,
        previous_status: BookingStatus,
    },
    PaymentReceived {
        booking_id: i32,
        correlation_id: String,
        status: BookingStatus,
    },
    PickupCompleted {
        booking_id: i32,
        route_id: i32,
        service_date: NaiveDate,
        period: Period,
        driver_id: i32,
    },
    RouteCompleted {
        route_id: i32,
        service_date: NaiveDate,
        period: Period,
        driver_id: Option<i32>,
    },
}

impl DomainEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEventKind::BookingCreated { .. } => "booking_created",
            DomainEventKind::BookingCancelled { .. } => "booking_cancelled",
            DomainEventKind::PaymentReceived { .. } => "payment_received",
            DomainEventKind::PickupCompleted { .. } => "pickup_completed",
            DomainEventKind::RouteCompleted { .. } => "route_completed",
        }
    }
}

/// A discrete fact emitted after a successful commit
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: DomainEventKind,
}

impl DomainEvent {
    pub fn new(kind: DomainEventKind, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at,
            kind,
        }
    }
}

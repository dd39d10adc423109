//! Data models for Schoolride

pub mod booking;
pub mod daily;
pub mod enums;
pub mod event;
pub mod route;
pub mod user;

// Re-export commonly used types
pub use booking::{Booking, NewBooking, PickupLocation};
pub use daily::{DailyPickupRecord, Roster, RosterEntry, RouteCompletion};
pub use enums::{BookingStatus, Period, PlanType, ServiceType, TripType};
pub use event::{DomainEvent, DomainEventKind};
pub use route::{PickupPoint, Route};
pub use user::{Role, UserClaims};

//! Shared domain enums, stored as Postgres enum types

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// BookingStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    AwaitingApproval,
    Active,
    Completed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    /// Statuses that count toward a route's seat usage
    pub const SEAT_HOLDING: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::AwaitingApproval,
        BookingStatus::Active,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::AwaitingApproval => "awaiting_approval",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
        }
    }

    pub fn holds_seat(&self) -> bool {
        Self::SEAT_HOLDING.contains(self)
    }

    /// Legal edges of the booking state machine
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, AwaitingApproval)
                | (Pending, Active)
                | (Pending, Cancelled)
                | (AwaitingApproval, Active)
                | (AwaitingApproval, Cancelled)
                | (Active, Completed)
                | (Active, Cancelled)
                | (Active, Expired)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PlanType
// ---------------------------------------------------------------------------

/// Subscription duration category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "plan_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Weekly,
    BiWeekly,
    Monthly,
    Term,
    Annual,
}

impl PlanType {
    pub const ALL: [PlanType; 5] = [
        PlanType::Weekly,
        PlanType::BiWeekly,
        PlanType::Monthly,
        PlanType::Term,
        PlanType::Annual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Weekly => "weekly",
            PlanType::BiWeekly => "bi_weekly",
            PlanType::Monthly => "monthly",
            PlanType::Term => "term",
            PlanType::Annual => "annual",
        }
    }
}

impl FromStr for PlanType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "weekly" => Ok(PlanType::Weekly),
            "bi_weekly" | "biweekly" => Ok(PlanType::BiWeekly),
            "monthly" => Ok(PlanType::Monthly),
            "term" | "semester" => Ok(PlanType::Term),
            "annual" | "yearly" => Ok(PlanType::Annual),
            _ => Err(AppError::InvalidPlanType(s.to_string())),
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TripType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "trip_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    /// Morning leg only (home to school)
    OneWay,
    TwoWay,
}

impl TripType {
    pub fn rides(&self, period: Period) -> bool {
        match self {
            TripType::OneWay => period == Period::Am,
            TripType::TwoWay => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// Daily service window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "service_period", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Am,
    Pm,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Am, Period::Pm];
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Am => f.write_str("am"),
            Period::Pm => f.write_str("pm"),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceType
// ---------------------------------------------------------------------------

/// Which periods a route operates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "service_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    AmOnly,
    PmOnly,
    Both,
}

impl ServiceType {
    pub fn serves(&self, period: Period) -> bool {
        match self {
            ServiceType::AmOnly => period == Period::Am,
            ServiceType::PmOnly => period == Period::Pm,
            ServiceType::Both => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn pending_reaches_only_its_direct_successors() {
        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(AwaitingApproval));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Expired));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        let all = [Pending, AwaitingApproval, Active, Completed, Cancelled, Expired];
        for from in [Completed, Cancelled, Expired] {
            assert!(!from.holds_seat());
            for to in all {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn no_state_transitions_to_itself() {
        for s in [Pending, AwaitingApproval, Active, Completed, Cancelled, Expired] {
            assert!(!s.can_transition_to(s));
        }
    }

    #[test]
    fn only_live_statuses_hold_seats() {
        assert!(Pending.holds_seat());
        assert!(AwaitingApproval.holds_seat());
        assert!(Active.holds_seat());
        assert!(!Cancelled.holds_seat());
        assert!(!Expired.holds_seat());
        assert!(!Completed.holds_seat());
    }

    #[test]
    fn plan_type_parsing_accepts_aliases() {
        assert_eq!("bi-weekly".parse::<PlanType>().unwrap(), PlanType::BiWeekly);
        assert_eq!("Semester".parse::<PlanType>().unwrap(), PlanType::Term);
        assert_eq!("annual".parse::<PlanType>().unwrap(), PlanType::Annual);
        assert!(matches!(
            "fortnightly-ish".parse::<PlanType>(),
            Err(AppError::InvalidPlanType(_))
        ));
    }

    #[test]
    fn one_way_trips_ride_the_morning_leg() {
        assert!(TripType::OneWay.rides(Period::Am));
        assert!(!TripType::OneWay.rides(Period::Pm));
        assert!(TripType::TwoWay.rides(Period::Pm));
    }

    #[test]
    fn service_type_filters_periods() {
        assert!(ServiceType::AmOnly.serves(Period::Am));
        assert!(!ServiceType::AmOnly.serves(Period::Pm));
        assert!(ServiceType::PmOnly.serves(Period::Pm));
        assert!(ServiceType::Both.serves(Period::Am) && ServiceType::Both.serves(Period::Pm));
    }
}

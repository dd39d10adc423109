//! Booking lifecycle service.
//!
//! Every status change goes through a conditional update on the current
//! status, so a transition applies at most once even when two requests race.
//! Events are published only after the change is committed.

use chrono::Duration;
use std::collections::HashSet;

use crate::{
    clock::SharedClock,
    config::BookingsConfig,
    error::{AppError, AppResult},
    models::{
        booking::{
            pickup_from_request, Booking, CreateBookingRequest, NewBooking, PickupLocation,
            PricedBooking, RebookRequest,
        },
        enums::{BookingStatus, Period, PlanType, TripType},
        event::DomainEventKind,
        route::{period_applies, Route},
    },
    repository::Repository,
};

use super::{capacity::CapacityService, events::EventBus, pricing::PricingService};

/// Periods a trip type rides on a route, ignoring pickup point schedules
pub fn ridden_periods(route: &Route, trip_type: TripType) -> Vec<Period> {
    Period::ALL
        .into_iter()
        .filter(|p| period_applies(route, None, trip_type, *p))
        .collect()
}

fn periods_intersect(a: &[Period], b: &[Period]) -> bool {
    a.iter().any(|p| b.contains(p))
}

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
    pricing: PricingService,
    capacity: CapacityService,
    events: EventBus,
    clock: SharedClock,
    config: BookingsConfig,
}

impl BookingsService {
    pub fn new(
        repository: Repository,
        pricing: PricingService,
        capacity: CapacityService,
        events: EventBus,
        clock: SharedClock,
        config: BookingsConfig,
    ) -> Self {
        Self {
            repository,
            pricing,
            capacity,
            events,
            clock,
            config,
        }
    }

    pub async fn get(&self, id: i32) -> AppResult<Booking> {
        self.repository.bookings.get_by_id(id).await
    }

    pub async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<Booking>> {
        self.repository.bookings.list_for_student(student_id).await
    }

    /// The booking followed by the bookings it was rebooked from, newest first
    pub async fn history(&self, id: i32) -> AppResult<Vec<Booking>> {
        let mut chain = vec![self.repository.bookings.get_by_id(id).await?];
        let mut seen = HashSet::from([id]);

        while let Some(previous_id) = chain.last().and_then(|b| b.previous_booking_id) {
            if !seen.insert(previous_id) {
                break;
            }
            chain.push(self.repository.bookings.get_by_id(previous_id).await?);
        }

        Ok(chain)
    }

    /// Check the pickup selection against the route and return the route
    async fn validate_pickup(&self, booking: &NewBooking) -> AppResult<Route> {
        let route = self.repository.routes.get_by_id(booking.route_id).await?;

        let point = match &booking.pickup {
            PickupLocation::PickupPoint { pickup_point_id } => {
                let point = self.repository.routes.get_pickup_point(*pickup_point_id).await?;
                if point.route_id != route.id {
                    return Err(AppError::Validation(format!(
                        "Pickup point {} does not belong to route {}",
                        point.id, route.id
                    )));
                }
                Some(point)
            }
            PickupLocation::Address { .. } => None,
        };

        let rides_any = Period::ALL
            .into_iter()
            .any(|p| period_applies(&route, point.as_ref(), booking.trip_type, p));
        if !rides_any {
            return Err(AppError::Validation(
                "This trip type is not served at the selected pickup on this route".to_string(),
            ));
        }

        Ok(route)
    }

    /// Create a pending booking and hold its seat.
    ///
    /// Nothing is persisted unless pricing, the duplicate check and the seat
    /// reservation all succeed.
    pub async fn create(&self, booking: NewBooking) -> AppResult<Booking> {
        let today = self.clock.today();
        if booking.start_date < today {
            return Err(AppError::Validation(format!(
                "Start date {} is in the past",
                booking.start_date
            )));
        }

        let route = self.validate_pickup(&booking).await?;
        let quote = self
            .pricing
            .price(&route, booking.plan_type, booking.trip_type, booking.start_date)?;

        let mut tx = self.repository.begin().await?;

        // Holds the route lock for the rest of the transaction
        let reservation = self.capacity.reserve(&mut *tx, route.id).await?;

        let wanted = ridden_periods(&route, booking.trip_type);
        let duplicate = self
            .repository
            .bookings
            .find_overlapping(&mut *tx, booking.student_id, route.id, booking.start_date, quote.end_date)
            .await?
            .into_iter()
            .any(|existing| periods_intersect(&wanted, &ridden_periods(&route, existing.trip_type)));
        if duplicate {
            tracing::warn!(
                student_id = booking.student_id,
                route_id = route.id,
                "Rejected overlapping booking"
            );
            return Err(AppError::DuplicateActiveBooking {
                student_id: booking.student_id,
                route_id: route.id,
            });
        }

        let priced = PricedBooking {
            booking,
            end_date: quote.end_date,
            price: quote.price,
        };
        let created = self
            .repository
            .bookings
            .insert(&mut *tx, &priced, self.clock.now())
            .await?;
        tx.commit().await?;

        tracing::info!(
            booking_id = created.id,
            route_id = created.route_id,
            seats_in_use = reservation.seats_in_use + 1,
            capacity = reservation.capacity,
            price = %created.price,
            "Booking created"
        );
        self.events.publish(DomainEventKind::BookingCreated {
            booking_id: created.id,
            student_id: created.student_id,
            route_id: created.route_id,
        });

        Ok(created)
    }

    /// Create from an API request on behalf of `booked_by`
    pub async fn create_from_request(
        &self,
        request: CreateBookingRequest,
        booked_by: Option<i32>,
    ) -> AppResult<Booking> {
        use validator::Validate;
        request.validate()?;

        let plan_type: PlanType = request.plan_type.parse()?;
        let pickup = pickup_from_request(request.pickup_point_id, request.address)?.ok_or_else(|| {
            AppError::Validation("Either pickup_point_id or address is required".to_string())
        })?;

        self.create(NewBooking {
            student_id: request.student_id,
            booked_by,
            route_id: request.route_id,
            pickup,
            plan_type,
            trip_type: request.trip_type,
            start_date: request.start_date,
            previous_booking_id: None,
        })
        .await
    }

    /// Create a new booking using a previous one as template.
    ///
    /// The previous booking is never modified.
    pub async fn rebook(
        &self,
        previous_id: i32,
        request: RebookRequest,
        booked_by: Option<i32>,
    ) -> AppResult<Booking> {
        use validator::Validate;
        request.validate()?;

        let previous = self.repository.bookings.get_by_id(previous_id).await?;
        let plan_type = match request.plan_type.as_deref() {
            Some(name) => name.parse()?,
            None => previous.plan_type,
        };
        let pickup = pickup_from_request(request.pickup_point_id, request.address)?
            .unwrap_or_else(|| previous.pickup.clone());

        self.create(NewBooking {
            student_id: previous.student_id,
            booked_by: booked_by.or(previous.booked_by),
            route_id: previous.route_id,
            pickup,
            plan_type,
            trip_type: request.trip_type.unwrap_or(previous.trip_type),
            start_date: request.start_date,
            previous_booking_id: Some(previous.id),
        })
        .await
    }

    /// Apply `to` if the booking is currently in one of `allowed_from`.
    ///
    /// Returns the status the booking left together with the updated booking.
    async fn apply(
        &self,
        id: i32,
        allowed_from: &[BookingStatus],
        to: BookingStatus,
        action: &'static str,
        payment_reference: Option<&str>,
    ) -> AppResult<(BookingStatus, Booking)> {
        let current = self.repository.bookings.get_by_id(id).await?;
        let from = current.status;

        if !allowed_from.contains(&from) || !from.can_transition_to(to) {
            tracing::warn!(booking_id = id, status = %from, action, "Rejected booking transition");
            return Err(AppError::InvalidStateTransition {
                booking_id: id,
                status: from,
                action,
            });
        }

        let updated = self
            .repository
            .bookings
            .transition(&self.repository.pool, id, &[from], to, payment_reference, self.clock.now())
            .await?;

        match updated {
            Some(booking) => {
                tracing::info!(booking_id = id, from = %from, to = %to, "Booking transitioned");
                Ok((from, booking))
            }
            None => {
                // Lost a race: someone else moved the booking first
                let status = self.repository.bookings.get_by_id(id).await?.status;
                tracing::warn!(booking_id = id, status = %status, action, "Booking changed concurrently");
                Err(AppError::InvalidStateTransition {
                    booking_id: id,
                    status,
                    action,
                })
            }
        }
    }

    fn released(&self, previous_status: BookingStatus, booking: &Booking) {
        if previous_status.holds_seat() && !booking.status.holds_seat() {
            self.capacity.release(booking.route_id, booking.id);
        }
    }

    fn cancelled(&self, previous_status: BookingStatus, booking: &Booking) {
        self.released(previous_status, booking);
        self.events.publish(DomainEventKind::BookingCancelled {
            booking_id: booking.id,
            route_id: booking.route_id,
            previous_status,
        });
    }

    /// Apply the payment gateway's verdict on a pending booking
    pub async fn record_payment_result(
        &self,
        id: i32,
        success: bool,
        correlation_id: &str,
    ) -> AppResult<Booking> {
        if !success {
            let (from, booking) = self
                .apply(id, &[BookingStatus::Pending], BookingStatus::Cancelled, "paid", Some(correlation_id))
                .await?;
            tracing::info!(booking_id = id, correlation_id, "Payment failed, booking cancelled");
            self.cancelled(from, &booking);
            return Ok(booking);
        }

        let to = if self.config.require_admin_approval {
            BookingStatus::AwaitingApproval
        } else {
            BookingStatus::Active
        };
        let (_, booking) = self
            .apply(id, &[BookingStatus::Pending], to, "paid", Some(correlation_id))
            .await?;

        self.events.publish(DomainEventKind::PaymentReceived {
            booking_id: booking.id,
            correlation_id: correlation_id.to_string(),
            status: booking.status,
        });
        Ok(booking)
    }

    pub async fn approve(&self, id: i32) -> AppResult<Booking> {
        let (_, booking) = self
            .apply(id, &[BookingStatus::AwaitingApproval], BookingStatus::Active, "approved", None)
            .await?;
        Ok(booking)
    }

    pub async fn reject(&self, id: i32) -> AppResult<Booking> {
        let (from, booking) = self
            .apply(id, &[BookingStatus::AwaitingApproval], BookingStatus::Cancelled, "rejected", None)
            .await?;
        self.cancelled(from, &booking);
        Ok(booking)
    }

    /// Cancel a seat-holding booking. Past pickup records are kept.
    pub async fn cancel(&self, id: i32) -> AppResult<Booking> {
        let (from, booking) = self
            .apply(id, &BookingStatus::SEAT_HOLDING, BookingStatus::Cancelled, "cancelled", None)
            .await?;
        self.cancelled(from, &booking);
        Ok(booking)
    }

    /// Close an active booking whose last service day has been reached
    pub async fn complete(&self, id: i32) -> AppResult<Booking> {
        let booking = self.repository.bookings.get_by_id(id).await?;
        let today = self.clock.today();
        if booking.status == BookingStatus::Active && today < booking.end_date {
            return Err(AppError::Validation(format!(
                "Booking {} runs until {}",
                id, booking.end_date
            )));
        }

        let (from, booking) = self
            .apply(id, &[BookingStatus::Active], BookingStatus::Completed, "completed", None)
            .await?;
        self.released(from, &booking);
        Ok(booking)
    }

    /// Expire every active booking that ended before today. Safe to re-run.
    pub async fn expire_due(&self) -> AppResult<Vec<Booking>> {
        let today = self.clock.today();
        let expired = self
            .repository
            .bookings
            .expire_ended(today, self.clock.now())
            .await?;

        for booking in &expired {
            self.released(BookingStatus::Active, booking);
        }
        tracing::info!(%today, count = expired.len(), "Expired ended bookings");

        Ok(expired)
    }

    /// Cancel unpaid holds older than the configured hold time. Safe to re-run.
    pub async fn cancel_stale_pending(&self) -> AppResult<Vec<Booking>> {
        let Some(minutes) = self.config.pending_hold_minutes else {
            return Ok(Vec::new());
        };

        let now = self.clock.now();
        let cutoff = now - Duration::minutes(i64::from(minutes));
        let cancelled = self
            .repository
            .bookings
            .cancel_pending_before(cutoff, now)
            .await?;

        for booking in &cancelled {
            self.cancelled(BookingStatus::Pending, booking);
        }
        if !cancelled.is_empty() {
            tracing::info!(count = cancelled.len(), %cutoff, "Cancelled stale pending bookings");
        }

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::ServiceType;
    use chrono::Utc;

    fn route(service_type: ServiceType) -> Route {
        Route {
            id: 1,
            name: "North".to_string(),
            vehicle_id: 1,
            driver_id: Some(3),
            service_type,
            base_rate: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn one_way_rides_only_the_morning() {
        assert_eq!(ridden_periods(&route(ServiceType::Both), TripType::OneWay), vec![Period::Am]);
        assert_eq!(
            ridden_periods(&route(ServiceType::Both), TripType::TwoWay),
            vec![Period::Am, Period::Pm]
        );
        assert!(ridden_periods(&route(ServiceType::PmOnly), TripType::OneWay).is_empty());
    }

    #[test]
    fn one_way_and_two_way_on_the_same_route_collide() {
        let r = route(ServiceType::Both);
        assert!(periods_intersect(
            &ridden_periods(&r, TripType::OneWay),
            &ridden_periods(&r, TripType::TwoWay)
        ));
        assert!(!periods_intersect(&[Period::Am], &[Period::Pm]));
    }
}

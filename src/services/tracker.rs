//! Daily pickup tracking.
//!
//! Records are keyed by (booking, date, period) and created on first access.
//! Marking is idempotent: a completed record keeps its first timestamp and
//! driver. Booking status is never touched here.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::{
    clock::SharedClock,
    error::{AppError, AppResult},
    models::{
        booking::Booking,
        daily::{DailyPickupRecord, Roster, RosterEntry},
        enums::{BookingStatus, Period},
        event::DomainEventKind,
        route::period_applies,
    },
    repository::Repository,
};

use super::{completions::CompletionsService, events::EventBus, roster::RosterPlanner};

/// Replace records in `current` with their updated version from `changed`
fn merge_changed(current: Vec<DailyPickupRecord>, changed: &[DailyPickupRecord]) -> Vec<DailyPickupRecord> {
    let changed: HashMap<i64, &DailyPickupRecord> = changed.iter().map(|r| (r.id, r)).collect();
    current
        .into_iter()
        .map(|r| match changed.get(&r.id) {
            Some(updated) => (*updated).clone(),
            None => r,
        })
        .collect()
}

#[derive(Clone)]
pub struct TrackerService {
    repository: Repository,
    planner: RosterPlanner,
    completions: CompletionsService,
    events: EventBus,
    clock: SharedClock,
    auto_complete_routes: bool,
}

impl TrackerService {
    pub fn new(
        repository: Repository,
        planner: RosterPlanner,
        completions: CompletionsService,
        events: EventBus,
        clock: SharedClock,
        auto_complete_routes: bool,
    ) -> Self {
        Self {
            repository,
            planner,
            completions,
            events,
            clock,
            auto_complete_routes,
        }
    }

    /// Roster of a route for a date and period, materializing missing records
    pub async fn roster_for(&self, route_id: i32, date: NaiveDate, period: Period) -> AppResult<Roster> {
        let expected = self.planner.expected(route_id, date, period).await?;
        let ids = expected.booking_ids();

        let pool = &self.repository.pool;
        self.repository.daily_records.ensure(pool, &ids, date, period).await?;
        let mut records: HashMap<i32, DailyPickupRecord> = self
            .repository
            .daily_records
            .find(pool, &ids, date, period)
            .await?
            .into_iter()
            .map(|r| (r.booking_id, r))
            .collect();

        let entries = expected
            .stops
            .into_iter()
            .map(|(booking, pickup_point)| {
                let record = records.remove(&booking.id).ok_or_else(|| {
                    AppError::Internal(format!("No pickup record for booking {} on {}", booking.id, date))
                })?;
                Ok(RosterEntry {
                    booking,
                    pickup_point,
                    record,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Roster {
            route_id,
            service_date: date,
            period,
            entries,
        })
    }

    /// Mark every booking picked up at a point as done.
    ///
    /// Without `period` both periods the point serves on `date` are marked.
    /// Returns the records of the affected bookings after marking.
    pub async fn mark_pickup_point_complete(
        &self,
        pickup_point_id: i32,
        route_id: i32,
        date: NaiveDate,
        period: Option<Period>,
        driver_id: i32,
    ) -> AppResult<Vec<DailyPickupRecord>> {
        let point = self.repository.routes.get_pickup_point(pickup_point_id).await?;
        if point.route_id != route_id {
            return Err(AppError::Validation(format!(
                "Pickup point {} does not belong to route {}",
                pickup_point_id, route_id
            )));
        }

        let periods = period.map_or(Period::ALL.to_vec(), |p| vec![p]);
        let mut planned = Vec::new();
        for period in periods {
            let ids = self
                .planner
                .expected(route_id, date, period)
                .await?
                .at_pickup_point(pickup_point_id)
                .booking_ids();
            if !ids.is_empty() {
                planned.push((period, ids));
            }
        }

        // All periods are marked in one transaction; completions are evaluated after commit
        let now = self.clock.now();
        let mut marked = Vec::new();
        let mut tx = self.repository.begin().await?;
        for (period, ids) in &planned {
            let active = self.repository.bookings.lock_active(&mut *tx, ids).await?;
            if active.is_empty() {
                continue;
            }

            let records = &self.repository.daily_records;
            records.ensure(&mut *tx, &active, date, *period).await?;
            let current = records.find(&mut *tx, &active, date, *period).await?;
            let record_ids: Vec<i64> = current.iter().map(|r| r.id).collect();
            let changed = records
                .complete_open(&mut *tx, &record_ids, now, driver_id, None)
                .await?;
            marked.push((*period, current, changed));
        }
        tx.commit().await?;

        let mut result = Vec::new();
        for (period, current, changed) in marked {
            tracing::info!(
                pickup_point_id,
                route_id,
                %date,
                %period,
                marked = changed.len(),
                already_done = current.len() - changed.len(),
                "Pickup point marked complete"
            );
            self.publish_completed(route_id, &changed);
            result.extend(merge_changed(current, &changed));
        }

        for (period, _) in &planned {
            self.maybe_complete_route(route_id, date, *period).await?;
        }

        Ok(result)
    }

    /// Mark a single booking done for a date and period
    pub async fn mark_booking_complete(
        &self,
        booking_id: i32,
        date: NaiveDate,
        period: Period,
        driver_id: i32,
        notes: Option<&str>,
    ) -> AppResult<DailyPickupRecord> {
        let mut tx = self.repository.begin().await?;
        let booking = self.repository.bookings.get_for_share(&mut *tx, booking_id).await?;
        self.check_window(&booking, date, period).await?;

        let records = &self.repository.daily_records;
        records.ensure(&mut *tx, &[booking_id], date, period).await?;
        let current = records
            .find(&mut *tx, &[booking_id], date, period)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal(format!("No pickup record for booking {} on {}", booking_id, date)))?;

        let changed = records
            .complete_open(&mut *tx, &[current.id], self.clock.now(), driver_id, notes)
            .await?;
        tx.commit().await?;

        let Some(record) = changed.into_iter().next() else {
            tracing::debug!(booking_id, %date, %period, "Pickup already completed");
            self.maybe_complete_route(booking.route_id, date, period).await?;
            return Ok(current);
        };

        tracing::info!(booking_id, %date, %period, driver_id, "Booking pickup marked complete");
        self.publish_completed(booking.route_id, std::slice::from_ref(&record));
        self.maybe_complete_route(booking.route_id, date, period).await?;

        Ok(record)
    }

    /// Fail with NotInActiveWindow unless the booking rides (date, period)
    async fn check_window(&self, booking: &Booking, date: NaiveDate, period: Period) -> AppResult<()> {
        let not_active = || AppError::NotInActiveWindow {
            booking_id: booking.id,
            date,
        };

        if booking.status != BookingStatus::Active || !booking.covers(date) {
            return Err(not_active());
        }
        if !self.planner.is_service_day(date) {
            return Err(not_active());
        }

        let route = self.repository.routes.get_by_id(booking.route_id).await?;
        let point = match booking.pickup.pickup_point_id() {
            Some(id) => Some(self.repository.routes.get_pickup_point(id).await?),
            None => None,
        };
        if !period_applies(&route, point.as_ref(), booking.trip_type, period) {
            return Err(not_active());
        }

        Ok(())
    }

    fn publish_completed(&self, route_id: i32, changed: &[DailyPickupRecord]) {
        for record in changed {
            if let Some(driver_id) = record.completed_by {
                self.events.publish(DomainEventKind::PickupCompleted {
                    booking_id: record.booking_id,
                    route_id,
                    service_date: record.service_date,
                    period: record.period,
                    driver_id,
                });
            }
        }
    }

    async fn maybe_complete_route(&self, route_id: i32, date: NaiveDate, period: Period) -> AppResult<()> {
        if self.auto_complete_routes {
            self.completions
                .evaluate_and_maybe_complete(route_id, date, period, None)
                .await?;
        }
        Ok(())
    }

    /// Materialize the records of every route served on `date`.
    ///
    /// Returns how many records were created; re-running creates none.
    pub async fn generate_rosters(&self, date: NaiveDate) -> AppResult<u64> {
        if !self.planner.is_service_day(date) {
            return Ok(0);
        }

        let mut created = 0;
        for route_id in self.repository.bookings.routes_active_on(date).await? {
            for period in Period::ALL {
                let ids = self.planner.expected(route_id, date, period).await?.booking_ids();
                created += self
                    .repository
                    .daily_records
                    .ensure(&self.repository.pool, &ids, date, period)
                    .await?;
            }
        }

        tracing::info!(%date, created, "Generated daily rosters");
        Ok(created)
    }

    /// Every record ever created for a booking
    pub async fn booking_records(&self, booking_id: i32) -> AppResult<Vec<DailyPickupRecord>> {
        self.repository.daily_records.list_for_booking(booking_id).await
    }
}

//! Route completion aggregation

use chrono::NaiveDate;

use crate::{
    clock::SharedClock,
    error::{AppError, AppResult},
    models::{
        daily::{Coverage, DailyPickupRecord, RouteCompletion, RouteCompletionStatus},
        enums::Period,
        event::DomainEventKind,
    },
    repository::Repository,
};

use super::{events::EventBus, roster::RosterPlanner};

/// Driver behind the most recent completed record
pub fn last_completing_driver(records: &[DailyPickupRecord]) -> Option<i32> {
    records
        .iter()
        .filter(|r| r.completed_at.is_some())
        .max_by_key(|r| (r.completed_at, r.id))
        .and_then(|r| r.completed_by)
}

#[derive(Clone)]
pub struct CompletionsService {
    repository: Repository,
    planner: RosterPlanner,
    events: EventBus,
    clock: SharedClock,
}

impl CompletionsService {
    pub fn new(repository: Repository, planner: RosterPlanner, events: EventBus, clock: SharedClock) -> Self {
        Self {
            repository,
            planner,
            events,
            clock,
        }
    }

    async fn coverage(
        &self,
        route_id: i32,
        date: NaiveDate,
        period: Period,
    ) -> AppResult<(Coverage, Vec<DailyPickupRecord>)> {
        let expected = self.planner.expected(route_id, date, period).await?;
        let ids = expected.booking_ids();
        let records = self
            .repository
            .daily_records
            .find(&self.repository.pool, &ids, date, period)
            .await?;
        Ok((Coverage::of(ids.len(), &records), records))
    }

    pub async fn status(&self, route_id: i32, date: NaiveDate, period: Period) -> AppResult<RouteCompletionStatus> {
        let (coverage, _) = self.coverage(route_id, date, period).await?;
        let completion = self.repository.route_completions.find(route_id, date, period).await?;

        Ok(RouteCompletionStatus {
            route_id,
            service_date: date,
            period,
            expected: coverage.expected,
            completed: coverage.completed,
            can_complete: coverage.is_complete() && completion.is_none(),
            completion,
        })
    }

    /// True when every expected pickup is done and no completion is recorded yet
    pub async fn can_complete(&self, route_id: i32, date: NaiveDate, period: Period) -> AppResult<bool> {
        Ok(self.status(route_id, date, period).await?.can_complete)
    }

    pub async fn find(&self, route_id: i32, date: NaiveDate, period: Period) -> AppResult<Option<RouteCompletion>> {
        self.repository.route_completions.find(route_id, date, period).await
    }

    /// Record the route completion if the key is fully covered.
    ///
    /// Returns the completion only when this call created it; re-evaluating a
    /// completed key is a no-op.
    pub async fn evaluate_and_maybe_complete(
        &self,
        route_id: i32,
        date: NaiveDate,
        period: Period,
        notes: Option<&str>,
    ) -> AppResult<Option<RouteCompletion>> {
        if self.repository.route_completions.find(route_id, date, period).await?.is_some() {
            return Ok(None);
        }

        let (coverage, records) = self.coverage(route_id, date, period).await?;
        if !coverage.is_complete() {
            tracing::debug!(
                route_id,
                %date,
                %period,
                expected = coverage.expected,
                completed = coverage.completed,
                "Route not yet complete"
            );
            return Ok(None);
        }

        let driver_id = last_completing_driver(&records);
        let created = self
            .repository
            .route_completions
            .insert_once(
                &self.repository.pool,
                route_id,
                date,
                period,
                self.clock.now(),
                driver_id,
                notes,
            )
            .await?;

        if let Some(completion) = &created {
            tracing::info!(route_id, %date, %period, ?driver_id, "Route completed");
            self.events.publish(DomainEventKind::RouteCompleted {
                route_id,
                service_date: date,
                period,
                driver_id: completion.completed_by,
            });
        }

        Ok(created)
    }

    /// Driver request to close a route trip with optional review notes.
    ///
    /// On a trip that is already complete the notes are attached to the
    /// stored completion, unless it carries a review already.
    pub async fn complete_route(
        &self,
        route_id: i32,
        date: NaiveDate,
        period: Period,
        notes: Option<&str>,
    ) -> AppResult<RouteCompletion> {
        if let Some(created) = self.evaluate_and_maybe_complete(route_id, date, period, notes).await? {
            return Ok(created);
        }

        let completions = &self.repository.route_completions;
        let Some(existing) = completions.find(route_id, date, period).await? else {
            return Err(AppError::Conflict(format!(
                "Route {} still has open pickups for {} {}",
                route_id, date, period
            )));
        };

        match notes {
            Some(notes) if existing.notes.is_none() => {
                match completions.record_review(route_id, date, period, notes).await? {
                    Some(reviewed) => {
                        tracing::info!(route_id, %date, %period, "Route review recorded");
                        Ok(reviewed)
                    }
                    // Another review won the race
                    None => Ok(completions.find(route_id, date, period).await?.unwrap_or(existing)),
                }
            }
            _ => Ok(existing),
        }
    }
}

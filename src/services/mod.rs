//! Business logic services

pub mod bookings;
pub mod capacity;
pub mod completions;
pub mod events;
pub mod operations;
pub mod pricing;
pub mod roster;
pub mod tracker;

use crate::{clock::SharedClock, config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub pricing: pricing::PricingService,
    pub capacity: capacity::CapacityService,
    pub bookings: bookings::BookingsService,
    pub roster: roster::RosterPlanner,
    pub tracker: tracker::TrackerService,
    pub completions: completions::CompletionsService,
    pub operations: operations::OperationsService,
    pub events: events::EventBus,
    pub clock: SharedClock,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig, clock: SharedClock) -> Self {
        let events = events::EventBus::new(config.events.channel_capacity, clock.clone());
        let pricing = pricing::PricingService::new(config.pricing.clone());
        let capacity = capacity::CapacityService::new(repository.clone());
        let roster = roster::RosterPlanner::new(
            repository.clone(),
            config.operations.service_weekdays.clone(),
        );

        let bookings = bookings::BookingsService::new(
            repository.clone(),
            pricing.clone(),
            capacity.clone(),
            events.clone(),
            clock.clone(),
            config.bookings.clone(),
        );
        let completions = completions::CompletionsService::new(
            repository.clone(),
            roster.clone(),
            events.clone(),
            clock.clone(),
        );
        let tracker = tracker::TrackerService::new(
            repository.clone(),
            roster.clone(),
            completions.clone(),
            events.clone(),
            clock.clone(),
            config.operations.auto_complete_routes,
        );
        let operations = operations::OperationsService::new(
            bookings.clone(),
            tracker.clone(),
            clock.clone(),
            config.operations.sweep_interval_minutes,
        );

        Self {
            repository,
            pricing,
            capacity,
            bookings,
            roster,
            tracker,
            completions,
            operations,
            events,
            clock,
        }
    }
}

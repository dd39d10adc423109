//! Which bookings a route is expected to serve on a date and period

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{
        booking::Booking,
        enums::Period,
        route::{period_applies, PickupPoint, Route},
    },
    repository::Repository,
};

/// Bookings expected on a (route, date, period) key, in driving order
#[derive(Debug, Clone)]
pub struct ExpectedRoster {
    pub route: Route,
    pub date: NaiveDate,
    pub period: Period,
    pub stops: Vec<(Booking, Option<PickupPoint>)>,
}

impl ExpectedRoster {
    pub fn booking_ids(&self) -> Vec<i32> {
        self.stops.iter().map(|(booking, _)| booking.id).collect()
    }

    /// Restrict to the bookings picked up at `pickup_point_id`
    pub fn at_pickup_point(mut self, pickup_point_id: i32) -> Self {
        self.stops
            .retain(|(booking, _)| booking.pickup.pickup_point_id() == Some(pickup_point_id));
        self
    }
}

/// Sort stops by pickup point sequence (ties by point id), address pickups last
pub fn sort_stops(stops: &mut [(Booking, Option<PickupPoint>)]) {
    stops.sort_by_key(|(booking, point)| match point {
        Some(p) => (0, p.sequence_order, p.id, booking.id),
        None => (1, 0, 0, booking.id),
    });
}

#[derive(Clone)]
pub struct RosterPlanner {
    repository: Repository,
    service_weekdays: Vec<u32>,
}

impl RosterPlanner {
    pub fn new(repository: Repository, service_weekdays: Vec<u32>) -> Self {
        Self {
            repository,
            service_weekdays,
        }
    }

    /// Whether routes run on `date` at all
    pub fn is_service_day(&self, date: NaiveDate) -> bool {
        self.service_weekdays
            .contains(&date.weekday().number_from_monday())
    }

    /// Active bookings on the route whose period applies on `date`
    pub async fn expected(&self, route_id: i32, date: NaiveDate, period: Period) -> AppResult<ExpectedRoster> {
        let route = self.repository.routes.get_by_id(route_id).await?;
        let mut roster = ExpectedRoster {
            route,
            date,
            period,
            stops: Vec::new(),
        };

        if !self.is_service_day(date) || !roster.route.service_type.serves(period) {
            return Ok(roster);
        }

        let points: HashMap<i32, PickupPoint> = self
            .repository
            .routes
            .list_pickup_points(route_id)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let bookings = self
            .repository
            .bookings
            .active_on(&self.repository.pool, route_id, date)
            .await?;

        roster.stops = bookings
            .into_iter()
            .map(|booking| {
                let point = booking
                    .pickup
                    .pickup_point_id()
                    .and_then(|id| points.get(&id).cloned());
                (booking, point)
            })
            .filter(|(booking, point)| {
                period_applies(&roster.route, point.as_ref(), booking.trip_type, period)
            })
            .collect();
        sort_stops(&mut roster.stops);

        Ok(roster)
    }
}

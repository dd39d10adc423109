//! Plan pricing and end-date computation

use chrono::{Days, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    config::PricingConfig,
    error::{AppError, AppResult},
    models::{
        enums::{PlanType, TripType},
        route::Route,
    },
};

/// Result of pricing a plan
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Decimal,
    pub end_date: NaiveDate,
}

#[derive(Clone)]
pub struct PricingService {
    config: PricingConfig,
}

impl PricingService {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// End date of a plan starting on `start`
    pub fn end_date(&self, plan_type: PlanType, start: NaiveDate) -> AppResult<NaiveDate> {
        let end = match plan_type {
            PlanType::Weekly => start.checked_add_days(Days::new(7)),
            PlanType::BiWeekly => start.checked_add_days(Days::new(14)),
            // Calendar months clamp to the last day (Jan 31 -> Feb 29)
            PlanType::Monthly => start.checked_add_months(Months::new(1)),
            PlanType::Term => start.checked_add_days(Days::new(u64::from(self.config.term_length_days))),
            PlanType::Annual => start.checked_add_months(Months::new(12)),
        };

        end.filter(|end| *end > start).ok_or_else(|| {
            AppError::PricingInvariantViolation(format!(
                "{} plan starting {} has no valid end date",
                plan_type, start
            ))
        })
    }

    /// Price a plan on `route`, rounded half-up to the smallest currency unit
    pub fn price(
        &self,
        route: &Route,
        plan_type: PlanType,
        trip_type: TripType,
        start: NaiveDate,
    ) -> AppResult<Quote> {
        let multiplier = self
            .config
            .plans
            .get(&plan_type)
            .copied()
            .ok_or_else(|| AppError::InvalidPlanType(plan_type.to_string()))?;

        let base_rate = route.base_rate.unwrap_or(self.config.default_base_rate);
        let trip_factor = match trip_type {
            TripType::TwoWay => Decimal::ONE,
            TripType::OneWay => self.config.one_way_factor,
        };

        let price = (base_rate * multiplier * trip_factor).round_dp_with_strategy(
            self.config.currency_decimals,
            RoundingStrategy::MidpointAwayFromZero,
        );

        if price <= Decimal::ZERO {
            return Err(AppError::PricingInvariantViolation(format!(
                "route {} {} plan priced at {}",
                route.id, plan_type, price
            )));
        }

        Ok(Quote {
            price,
            end_date: self.end_date(plan_type, start)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::ServiceType;
    use chrono::Utc;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn route(base_rate: Option<Decimal>) -> Route {
        Route {
            id: 5,
            name: "East".to_string(),
            vehicle_id: 1,
            driver_id: None,
            service_type: ServiceType::Both,
            base_rate,
            created_at: Utc::now(),
        }
    }

    fn service() -> PricingService {
        PricingService::new(PricingConfig::default())
    }

    #[test]
    fn weekly_plan_ends_seven_days_later() {
        assert_eq!(service().end_date(PlanType::Weekly, date(2024, 1, 1)).unwrap(), date(2024, 1, 8));
        assert_eq!(service().end_date(PlanType::BiWeekly, date(2024, 1, 1)).unwrap(), date(2024, 1, 15));
    }

    #[test]
    fn monthly_plan_uses_calendar_months() {
        let s = service();
        assert_eq!(s.end_date(PlanType::Monthly, date(2024, 1, 31)).unwrap(), date(2024, 2, 29));
        assert_eq!(s.end_date(PlanType::Monthly, date(2023, 1, 31)).unwrap(), date(2023, 2, 28));
        assert_eq!(s.end_date(PlanType::Monthly, date(2024, 3, 15)).unwrap(), date(2024, 4, 15));
    }

    #[test]
    fn annual_plan_from_leap_day_clamps() {
        assert_eq!(service().end_date(PlanType::Annual, date(2024, 2, 29)).unwrap(), date(2025, 2, 28));
    }

    #[test]
    fn term_length_comes_from_configuration() {
        let mut config = PricingConfig::default();
        config.term_length_days = 90;
        let s = PricingService::new(config);
        assert_eq!(s.end_date(PlanType::Term, date(2024, 9, 1)).unwrap(), date(2024, 11, 30));
    }

    #[test]
    fn route_base_rate_overrides_default() {
        let quote = service()
            .price(&route(Some(Decimal::new(5000, 2))), PlanType::Monthly, TripType::TwoWay, date(2024, 1, 1))
            .unwrap();
        assert_eq!(quote.price, Decimal::new(18000, 2));

        let quote = service()
            .price(&route(None), PlanType::Weekly, TripType::TwoWay, date(2024, 1, 1))
            .unwrap();
        assert_eq!(quote.price, Decimal::new(4500, 2));
    }

    #[test]
    fn one_way_price_rounds_half_up() {
        // 10.25 * 1.0 * 0.5 = 5.125 -> 5.13
        let mut config = PricingConfig::default();
        config.one_way_factor = Decimal::new(5, 1);
        let s = PricingService::new(config);
        let quote = s
            .price(&route(Some(Decimal::new(1025, 2))), PlanType::Weekly, TripType::OneWay, date(2024, 1, 1))
            .unwrap();
        assert_eq!(quote.price, Decimal::new(513, 2));
    }

    #[test]
    fn plan_missing_from_table_is_invalid() {
        let mut config = PricingConfig::default();
        config.plans = HashMap::from([(PlanType::Weekly, Decimal::ONE)]);
        let s = PricingService::new(config);
        let err = s
            .price(&route(None), PlanType::Annual, TripType::TwoWay, date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidPlanType(_)));
    }

    #[test]
    fn unknown_plan_name_is_invalid() {
        let err = "lifetime".parse::<PlanType>().unwrap_err();
        assert!(matches!(err, AppError::InvalidPlanType(_)));
    }

    #[test]
    fn zero_price_is_an_invariant_violation() {
        let mut config = PricingConfig::default();
        config.plans.insert(PlanType::Weekly, Decimal::ZERO);
        let s = PricingService::new(config);
        let err = s
            .price(&route(None), PlanType::Weekly, TripType::TwoWay, date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, AppError::PricingInvariantViolation(_)));
    }

    #[test]
    fn price_that_rounds_to_zero_is_rejected() {
        let s = service();
        let err = s
            .price(&route(Some(Decimal::new(1, 3))), PlanType::Weekly, TripType::TwoWay, date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, AppError::PricingInvariantViolation(_)));
    }
}

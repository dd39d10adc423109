//! Broadcast of domain events to the notification subsystem

use tokio::sync::broadcast;

use crate::{
    clock::SharedClock,
    models::event::{DomainEvent, DomainEventKind},
};

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
    clock: SharedClock,
}

impl EventBus {
    pub fn new(capacity: usize, clock: SharedClock) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, clock }
    }

    /// Emit an event. Having no subscriber is not an error.
    pub fn publish(&self, kind: DomainEventKind) {
        let event = DomainEvent::new(kind, self.clock.now());
        tracing::debug!(event = event.kind.name(), id = %event.id, "Publishing domain event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn bus() -> EventBus {
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        EventBus::new(8, clock)
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = bus();
        let mut rx = bus.subscribe();

        bus.publish(DomainEventKind::BookingCreated {
            booking_id: 1,
            student_id: 2,
            route_id: 3,
        });
        bus.publish(DomainEventKind::BookingCancelled {
            booking_id: 1,
            route_id: 3,
            previous_status: crate::models::BookingStatus::Pending,
        });

        let first = tokio_test::assert_ok!(rx.recv().await);
        let second = tokio_test::assert_ok!(rx.recv().await);
        assert_eq!(first.kind.name(), "booking_created");
        assert_eq!(second.kind.name(), "booking_cancelled");
        assert_eq!(first.occurred_at.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        bus().publish(DomainEventKind::RouteCompleted {
            route_id: 5,
            service_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            period: crate::models::Period::Am,
            driver_id: None,
        });
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = DomainEvent::new(
            DomainEventKind::PaymentReceived {
                booking_id: 4,
                correlation_id: "pay_123".to_string(),
                status: crate::models::BookingStatus::Active,
            },
            chrono::Utc::now(),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "payment_received");
        assert_eq!(json["correlation_id"], "pay_123");
        assert_eq!(json["status"], "active");
    }
}

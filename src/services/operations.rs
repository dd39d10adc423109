//! Daily batch operations and the background sweep

use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::{clock::SharedClock, error::AppResult};

use super::{bookings::BookingsService, tracker::TrackerService};

/// Outcome of one sweep run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    pub expired: usize,
    pub stale_cancelled: usize,
    pub records_created: u64,
}

#[derive(Clone)]
pub struct OperationsService {
    bookings: BookingsService,
    tracker: TrackerService,
    clock: SharedClock,
    interval: Duration,
}

impl OperationsService {
    pub fn new(
        bookings: BookingsService,
        tracker: TrackerService,
        clock: SharedClock,
        sweep_interval_minutes: u64,
    ) -> Self {
        Self {
            bookings,
            tracker,
            clock,
            interval: Duration::from_secs(sweep_interval_minutes.max(1) * 60),
        }
    }

    /// Expire ended bookings, drop stale holds and build today's rosters.
    ///
    /// Every step is idempotent, so an interrupted sweep can simply run again.
    pub async fn sweep(&self) -> AppResult<SweepReport> {
        let expired = self.bookings.expire_due().await?.len();
        let stale_cancelled = self.bookings.cancel_stale_pending().await?.len();
        let records_created = self.tracker.generate_rosters(self.clock.today()).await?;

        Ok(SweepReport {
            expired,
            stale_cancelled,
            records_created,
        })
    }

    /// Run the sweep forever on a fixed interval. Failures are logged and the
    /// next tick retries.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match self.sweep().await {
                    Ok(report) => tracing::info!(?report, "Daily sweep finished"),
                    Err(e) => tracing::error!("Daily sweep failed: {}", e),
                }
            }
        })
    }
}

//! Reminder dispatcher: periodic background task that reminds subscribers
//! of events about to start.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::{EventRepository, SubscriptionManager};
use crate::error::ApiError;

/// Periodically scans the look-ahead window and sends one reminder per
/// subscriber and event start time.
#[derive(Debug, Clone)]
pub struct ReminderDispatcher {
    events: EventRepository,
    subscriptions: SubscriptionManager,
    interval: Duration,
    lookahead: chrono::Duration,
}

impl ReminderDispatcher {
    /// Creates a dispatcher ticking every `interval` and looking `lookahead`
    /// into the future.
    #[must_use]
    pub fn new(
        events: EventRepository,
        subscriptions: SubscriptionManager,
        interval: Duration,
        lookahead: chrono::Duration,
    ) -> Self {
        Self {
            events,
            subscriptions,
            interval,
            lookahead,
        }
    }

    /// Runs one scan as of `now`. Returns the number of reminders sent.
    ///
    /// # Errors
    ///
    /// Propagates store failures. Reminders already claimed in a failed scan
    /// are not kept.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize, ApiError> {
        let upcoming = self.events.upcoming(now, self.lookahead).await?;
        if upcoming.is_empty() {
            return Ok(0);
        }

        let claimed = self.subscriptions.claim_due(&upcoming).await?;
        let mut sent = 0;
        for (event, subscribers) in &claimed {
            sent += self.subscriptions.notify_reminder(event, subscribers);
        }

        if sent > 0 {
            tracing::info!(events = claimed.len(), reminders = sent, "reminders sent");
        }
        Ok(sent)
    }

    /// Runs the dispatcher loop until `cancel` is triggered.
    ///
    /// A failing tick is logged and the loop carries on.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            lookahead_mins = self.lookahead.num_minutes(),
            "reminder dispatcher started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("reminder dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        tracing::error!(error = %e, "reminder tick failed");
                    }
                }
            }
        }
    }
}

//! Periodic eviction of participants that stopped sending heartbeats.
//!
//! Each sweep removes stale entries from the registry and posts a
//! "leaves the room..." status notice for every one of them. The eviction is not
//! undone when a notice cannot be stored; the failure is logged instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::common::{MessageDraft, Result, format_clock_time, types::LEAVE_TEXT};
use crate::service::ChatService;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(10);

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: Vec<String>,
    pub notices_stored: usize,
}

pub struct Janitor {
    service: Arc<ChatService>,
    period: Duration,
    stale_after: Duration,
}

impl Janitor {
    pub fn new(service: Arc<ChatService>, period: Duration, stale_after: Duration) -> Self {
        Self {
            service,
            period,
            stale_after,
        }
    }

    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let now = self.service.clock().now_millis();
        let evicted = self
            .service
            .registry()
            .sweep_evict(now, self.stale_after)
            .await?;
        if evicted.is_empty() {
            return Ok(SweepReport::default());
        }

        let time = format_clock_time(now);
        let drafts: Vec<MessageDraft> = evicted
            .iter()
            .map(|p| MessageDraft::status(p.name.clone(), LEAVE_TEXT).with_time(time.clone()))
            .collect();

        let mut notices_stored = 0;
        for (participant, outcome) in evicted
            .iter()
            .zip(self.service.store().append_many(drafts).await)
        {
            match outcome {
                Ok(_) => notices_stored += 1,
                Err(err) => log::error!(
                    "Evicted {} but failed to store the leave notice: {err}",
                    participant.name
                ),
            }
        }

        Ok(SweepReport {
            evicted: evicted.into_iter().map(|p| p.name).collect(),
            notices_stored,
        })
    }

    /// Sweeps every `period` until `cancel` fires. The first sweep happens one
    /// period after start. A sweep in progress is allowed to finish.
    pub async fn run(self, cancel: CancellationToken) {
        log::info!(
            "Janitor started (every {:?}, evicting after {:?} without heartbeat)",
            self.period,
            self.stale_after
        );

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(report) if report.evicted.is_empty() => {
                            log::debug!("Sweep found no stale participants");
                        }
                        Ok(report) => {
                            log::info!(
                                "Evicted {} participant(s): {}",
                                report.evicted.len(),
                                report.evicted.join(", ")
                            );
                        }
                        Err(err) => {
                            log::error!("Sweep failed, retrying in {:?}: {err}", self.period);
                        }
                    }
                }
            }
        }

        log::info!("Janitor stopped");
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

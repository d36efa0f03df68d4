//! Publication Scheduler - drives the executor's two entry points
//!
//! - `execute_pending_jobs` every `job_interval`
//! - `publish_nightly_changelog` once a day at `nightly_hour_utc`

use crate::application::executor::constants::ERROR_RECOVERY_SLEEP_DURATION;
use crate::application::executor::{PublicationExecutor, ShutdownToken};
use crate::port::TimeProvider;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

pub struct PublicationScheduler {
    executor: Arc<PublicationExecutor>,
    time_provider: Arc<dyn TimeProvider>,
    job_interval: Duration,
    nightly_hour_utc: u32,
}

impl PublicationScheduler {
    pub fn new(
        executor: Arc<PublicationExecutor>,
        time_provider: Arc<dyn TimeProvider>,
        job_interval: Duration,
        nightly_hour_utc: u32,
    ) -> Self {
        Self {
            executor,
            time_provider,
            job_interval,
            nightly_hour_utc: nightly_hour_utc.min(23),
        }
    }

    /// Run until shutdown is requested
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            job_interval_ms = self.job_interval.as_millis() as u64,
            nightly_hour_utc = self.nightly_hour_utc,
            "Publication scheduler started"
        );

        let mut next_nightly = self.instant_of_next_nightly();

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            if Instant::now() >= next_nightly {
                if let Err(e) = self.executor.publish_nightly_changelog().await {
                    error!(error = %e, "Nightly changelog failed");
                }
                next_nightly = self.instant_of_next_nightly();
            }

            let pause = match self.executor.execute_pending_jobs().await {
                Ok(_) => self.job_interval,
                Err(e) => {
                    error!(error = %e, "Executor pass failed");
                    ERROR_RECOVERY_SLEEP_DURATION.max(self.job_interval)
                }
            };

            let wake_at = (Instant::now() + pause).min(next_nightly);
            tokio::select! {
                _ = tokio::time::sleep_until(wake_at) => {},
                _ = shutdown.wait() => {
                    info!("Scheduler interrupted while idle");
                    break;
                }
            }
        }
        info!("Publication scheduler stopped");
    }

    fn instant_of_next_nightly(&self) -> Instant {
        let now = self.time_provider.now_millis();
        let wait_ms = next_nightly_delay_ms(now, self.nightly_hour_utc);
        Instant::now() + Duration::from_millis(wait_ms as u64)
    }
}

/// Milliseconds from `now_millis` until the next `hour:00:00` UTC
///
/// Exactly on the hour counts as the next day.
pub fn next_nightly_delay_ms(now_millis: i64, hour_utc: u32) -> i64 {
    let now: DateTime<Utc> = Utc
        .timestamp_millis_opt(now_millis)
        .single()
        .unwrap_or_default();

    let today_at = now
        .with_hour(hour_utc.min(23))
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);

    let next = if today_at > now {
        today_at
    } else {
        today_at + ChronoDuration::days(1)
    };
    (next - now).num_milliseconds()
}

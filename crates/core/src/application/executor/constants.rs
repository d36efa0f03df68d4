// Executor constants (no magic values)
use std::time::Duration;

/// Lease on a document while one of its jobs runs (5 minutes)
pub const DEFAULT_LEASE_TTL_MS: i64 = 5 * 60 * 1000;

/// Pause between executor passes in the scheduler loop (10s)
pub const DEFAULT_JOB_INTERVAL: Duration = Duration::from_secs(10);

/// UTC hour of the nightly full-resync changelog
pub const DEFAULT_NIGHTLY_HOUR_UTC: u32 = 2;

/// Total attempts per publication intent, including the first
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Backoff before the second attempt (1 minute)
pub const DEFAULT_RETRY_BASE_DELAY_MS: i64 = 60 * 1000;

/// Sleep after a failed executor pass before the next one (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

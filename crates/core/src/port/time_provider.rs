// Time Provider Port (for testability)

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Manually driven clock
    ///
    /// Every read advances the clock by `step_ms` so consecutive jobs get
    /// distinct creation times.
    pub struct FixedTimeProvider {
        now: AtomicI64,
        step_ms: i64,
    }

    impl FixedTimeProvider {
        pub fn new(start_millis: i64) -> Self {
            Self::with_step(start_millis, 0)
        }

        pub fn with_step(start_millis: i64, step_ms: i64) -> Self {
            Self {
                now: AtomicI64::new(start_millis),
                step_ms,
            }
        }

        pub fn advance(&self, millis: i64) {
            self.now.fetch_add(millis, Ordering::SeqCst);
        }

        pub fn set(&self, millis: i64) {
            self.now.store(millis, Ordering::SeqCst);
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.fetch_add(self.step_ms, Ordering::SeqCst)
        }
    }
}

// Time Provider Port (for testability)

use std::time::Instant;

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds
    ///
    /// Only differences between two readings are meaningful.
    fn now_millis(&self) -> i64;
}

/// System time provider (production)
///
/// Backed by a monotonic clock, so wall-clock adjustments never produce
/// a burst of refills or a stalled bucket.
pub struct SystemTimeProvider {
    origin: Instant,
}

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Manually driven clock
    #[derive(Default)]
    pub struct MockTimeProvider {
        now_ms: AtomicI64,
    }

    impl MockTimeProvider {
        pub fn new(start_ms: i64) -> Self {
            Self {
                now_ms: AtomicI64::new(start_ms),
            }
        }

        pub fn advance_millis(&self, delta_ms: i64) {
            self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
        }

        pub fn advance_secs(&self, delta_secs: i64) {
            self.advance_millis(delta_secs * 1000);
        }

        pub fn set_millis(&self, now_ms: i64) {
            self.now_ms.store(now_ms, Ordering::SeqCst);
        }
    }

    impl TimeProvider for MockTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now_ms.load(Ordering::SeqCst)
        }
    }
}

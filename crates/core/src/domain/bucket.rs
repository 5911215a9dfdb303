// Token Bucket (global admission counter)
//
// Lazily refilled: no background timer, every acquire first credits the
// whole seconds elapsed since the last successful refill.

use crate::config::RateLimitConfig;
use crate::port::{AdmissionPolicy, TimeProvider};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

const MILLIS_PER_SECOND: i64 = 1000;

/// Point-in-time view of a bucket, for logs and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketSnapshot {
    pub capacity: u64,
    pub refill_rate: u64,
    pub tokens: u64,
}

struct BucketState {
    tokens: u64,
    last_refill_ms: i64,
}

/// Token bucket shared by every request handler
///
/// All mutation happens inside one mutex-guarded critical section, so
/// concurrent callers see a total order of grants.
pub struct TokenBucket {
    capacity: u64,
    refill_rate: u64,
    state: Mutex<BucketState>,
    time_provider: Arc<dyn TimeProvider>,
}

impl TokenBucket {
    /// Create a full bucket
    ///
    /// # Arguments
    /// * `capacity` - Maximum tokens held (burst size)
    /// * `refill_rate` - Tokens added per elapsed whole second
    /// * `time_provider` - Clock used for refill computation
    ///
    /// # Example
    /// ```text
    /// // Burst of 5, then 2 requests/sec
    /// let bucket = TokenBucket::new(5, 2, Arc::new(SystemTimeProvider::new()));
    /// ```
    pub fn new(capacity: u64, refill_rate: u64, time_provider: Arc<dyn TimeProvider>) -> Self {
        let now = time_provider.now_millis();
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill_ms: now,
            }),
            time_provider,
        }
    }

    pub fn from_config(config: &RateLimitConfig, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::new(config.capacity, config.refill_rate, time_provider)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> u64 {
        self.refill_rate
    }

    /// Consume one token if available
    ///
    /// Refill is computed from truncated whole seconds. When no full second
    /// has passed, `last_refill_ms` stays put so the partial second is still
    /// credited on a later call.
    pub fn try_acquire(&self) -> bool {
        let now = self.time_provider.now_millis();
        let mut state = self.lock_state();

        let elapsed_secs = now.saturating_sub(state.last_refill_ms).max(0) / MILLIS_PER_SECOND;
        let refill = (elapsed_secs as u64).saturating_mul(self.refill_rate);

        if refill > 0 {
            state.tokens = state.tokens.saturating_add(refill).min(self.capacity);
            state.last_refill_ms = now;
        }

        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Current state without refilling
    pub fn snapshot(&self) -> BucketSnapshot {
        let state = self.lock_state();
        BucketSnapshot {
            capacity: self.capacity,
            refill_rate: self.refill_rate,
            tokens: state.tokens,
        }
    }

    // Every statement inside the critical section leaves the state valid,
    // so a poisoned lock still guards consistent data.
    fn lock_state(&self) -> std::sync::MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AdmissionPolicy for TokenBucket {
    fn try_acquire(&self) -> bool {
        TokenBucket::try_acquire(self)
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("TokenBucket")
            .field("capacity", &snapshot.capacity)
            .field("refill_rate", &snapshot.refill_rate)
            .field("tokens", &snapshot.tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::time_provider::mocks::MockTimeProvider;

    fn bucket(capacity: u64, refill_rate: u64) -> (TokenBucket, Arc<MockTimeProvider>) {
        let clock = Arc::new(MockTimeProvider::new(0));
        let bucket = TokenBucket::new(capacity, refill_rate, clock.clone());
        (bucket, clock)
    }

    fn drain(bucket: &TokenBucket) -> u64 {
        let mut granted = 0;
        while bucket.try_acquire() {
            granted += 1;
        }
        granted
    }

    #[test]
    fn test_starts_full() {
        let (bucket, _) = bucket(5, 2);
        assert_eq!(bucket.snapshot().tokens, 5);
        assert_eq!(bucket.capacity(), 5);
        assert_eq!(bucket.refill_rate(), 2);
    }

    #[test]
    fn test_exhaustion_after_capacity_calls() {
        let (bucket, _) = bucket(5, 2);

        for i in 0..5 {
            assert!(bucket.try_acquire(), "call {} should be granted", i + 1);
        }
        assert!(!bucket.try_acquire(), "6th call should be rejected");
        assert_eq!(bucket.snapshot().tokens, 0);
    }

    #[test]
    fn test_sub_second_elapsed_gives_no_refill() {
        let (bucket, clock) = bucket(5, 2);
        assert_eq!(drain(&bucket), 5);

        clock.advance_millis(999);
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_one_second_refills_rate_tokens() {
        let (bucket, clock) = bucket(5, 2);
        assert_eq!(drain(&bucket), 5);

        clock.advance_secs(1);
        assert_eq!(drain(&bucket), 2);
    }

    #[test]
    fn test_refill_uses_truncated_whole_seconds() {
        let (bucket, clock) = bucket(5, 2);
        assert_eq!(drain(&bucket), 5);

        // 1.9s counts as one second
        clock.advance_millis(1_900);
        assert_eq!(drain(&bucket), 2);
    }

    #[test]
    fn test_partial_second_is_not_lost() {
        let (bucket, clock) = bucket(5, 2);
        assert_eq!(drain(&bucket), 5);

        // Rejected before the boundary; last refill time must not move
        clock.advance_millis(600);
        assert!(!bucket.try_acquire());

        // 600ms + 400ms = one full second since the last refill
        clock.advance_millis(400);
        assert!(bucket.try_acquire());
    }

    #[test]
    fn test_refill_capped_at_capacity() {
        let (bucket, clock) = bucket(5, 2);
        assert_eq!(drain(&bucket), 5);

        clock.advance_secs(2);
        assert_eq!(drain(&bucket), 4);

        clock.advance_secs(10);
        assert_eq!(drain(&bucket), 5);
    }

    #[test]
    fn test_long_idle_observes_exactly_capacity() {
        let (bucket, clock) = bucket(5, 2);
        assert!(bucket.try_acquire());

        clock.advance_secs(1_000_000);
        assert!(bucket.try_acquire());
        // capacity before the decrement, capacity - 1 after
        assert_eq!(bucket.snapshot().tokens, 4);
    }

    #[test]
    fn test_huge_elapsed_does_not_overflow() {
        let (bucket, clock) = bucket(3, u64::MAX);
        assert_eq!(drain(&bucket), 3);

        clock.set_millis(i64::MAX);
        assert_eq!(drain(&bucket), 3);
    }

    #[test]
    fn test_clock_going_backwards_gives_no_refill() {
        let clock = Arc::new(MockTimeProvider::new(10_000));
        let bucket = TokenBucket::new(2, 5, clock.clone());
        assert_eq!(drain(&bucket), 2);

        clock.set_millis(0);
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_zero_capacity_never_grants() {
        let (bucket, clock) = bucket(0, 10);
        assert!(!bucket.try_acquire());

        clock.advance_secs(5);
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_zero_rate_never_refills() {
        let (bucket, clock) = bucket(1, 0);
        assert!(bucket.try_acquire());

        clock.advance_secs(60);
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_tokens_stay_within_bounds() {
        let (bucket, clock) = bucket(4, 3);
        let steps = [0, 250, 1_000, 3_500, 0, 700, 10_000, 1, 999, 2_000];

        for step in steps {
            clock.advance_millis(step);
            bucket.try_acquire();
            let tokens = bucket.snapshot().tokens;
            assert!(tokens <= 4, "tokens {} exceeded capacity", tokens);
        }
    }

    #[test]
    fn test_from_config() {
        let clock = Arc::new(MockTimeProvider::new(0));
        let bucket = TokenBucket::from_config(&RateLimitConfig::default(), clock);
        assert_eq!(
            bucket.snapshot(),
            BucketSnapshot {
                capacity: 5,
                refill_rate: 2,
                tokens: 5,
            }
        );
    }

    #[test]
    fn test_concurrent_grants_equal_capacity() {
        let (bucket, _) = bucket(50, 1);
        let bucket = Arc::new(bucket);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                std::thread::spawn(move || (0..20).filter(|_| bucket.try_acquire()).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // 160 attempts, no time elapsed: exactly capacity grants
        assert_eq!(granted, 50);
        assert_eq!(bucket.snapshot().tokens, 0);
    }

    #[test]
    fn test_concurrent_grants_fewer_callers_than_capacity() {
        let (bucket, _) = bucket(100, 1);
        let bucket = Arc::new(bucket);

        let handles: Vec<_> = (0..30)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                std::thread::spawn(move || bucket.try_acquire())
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(granted, 30);
        assert_eq!(bucket.snapshot().tokens, 70);
    }

    #[test]
    fn test_usable_as_admission_policy() {
        let (bucket, _) = bucket(1, 0);
        let policy: Arc<dyn AdmissionPolicy> = Arc::new(bucket);
        assert!(policy.try_acquire());
        assert!(!policy.try_acquire());
    }
}

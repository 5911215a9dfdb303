// Admission Policy Port
//
// The HTTP filter only needs a yes/no answer per request; it never sees
// bucket internals. Keeps the adapter testable with canned policies.

/// Decides whether a single inbound request may proceed
pub trait AdmissionPolicy: Send + Sync {
    /// Try to take one permit
    ///
    /// Returns `false` when the request must be rejected. This is a normal
    /// outcome, never an error, and the call never blocks on I/O.
    fn try_acquire(&self) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Policy with a switchable fixed answer that counts how often it was asked
    pub struct MockAdmissionPolicy {
        allow: AtomicBool,
        calls: AtomicU64,
    }

    impl MockAdmissionPolicy {
        pub fn new(allow: bool) -> Self {
            Self {
                allow: AtomicBool::new(allow),
                calls: AtomicU64::new(0),
            }
        }

        pub fn set_allow(&self, allow: bool) {
            self.allow.store(allow, Ordering::SeqCst);
        }

        pub fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AdmissionPolicy for MockAdmissionPolicy {
        fn try_acquire(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.allow.load(Ordering::SeqCst)
        }
    }
}

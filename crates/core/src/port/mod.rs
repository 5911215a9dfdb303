// Port Layer - Interfaces for external dependencies

pub mod admission;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use admission::AdmissionPolicy;
pub use time_provider::{SystemTimeProvider, TimeProvider};

// Domain Layer - Pure admission-control state

pub mod bucket;

// Re-exports
pub use bucket::{BucketSnapshot, TokenBucket};

//! HTTP API Layer
//!
//! Serves the demo endpoint behind a token-bucket admission filter.

pub mod error;
pub mod handler;
pub mod rate_limit;
pub mod server;

pub use error::ServerError;
pub use rate_limit::{RateLimitLayer, RateLimitService, RateLimitStats, RateLimitStatsSnapshot};
pub use server::HttpServer;

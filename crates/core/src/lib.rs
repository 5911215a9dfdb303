// Tollgate Core - Domain Logic & Ports
// NO HTTP or runtime-bootstrap dependencies (hexagonal core)

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

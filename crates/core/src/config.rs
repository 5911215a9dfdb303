// Configuration (No magic values)
//
// Every setting has a named default and an environment override. The daemon
// layers CLI flags on top of these.

use crate::error::{AppError, Result};
use std::str::FromStr;
use std::time::Duration;

/// Default bucket capacity (burst size)
pub const DEFAULT_CAPACITY: u64 = 5;

/// Default refill rate (tokens per second)
pub const DEFAULT_REFILL_RATE: u64 = 2;

/// Default bind host (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Request lifecycle timeout (30s)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long in-flight requests may drain after a shutdown signal (5s)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const ENV_CAPACITY: &str = "TOLLGATE_RATE_LIMIT_CAPACITY";
pub const ENV_REFILL_RATE: &str = "TOLLGATE_RATE_LIMIT_RATE";
pub const ENV_HOST: &str = "TOLLGATE_HOST";
pub const ENV_PORT: &str = "TOLLGATE_PORT";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TOLLGATE_REQUEST_TIMEOUT_SECS";
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "TOLLGATE_SHUTDOWN_TIMEOUT_SECS";

/// Token bucket parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum tokens held by the bucket
    pub capacity: u64,
    /// Tokens added per elapsed whole second
    pub refill_rate: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_rate: DEFAULT_REFILL_RATE,
        }
    }
}

impl RateLimitConfig {
    /// Defaults overridden by `TOLLGATE_RATE_LIMIT_*` variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity: parse_var(&lookup, ENV_CAPACITY)?.unwrap_or(defaults.capacity),
            refill_rate: parse_var(&lookup, ENV_REFILL_RATE)?.unwrap_or(defaults.refill_rate),
        })
    }

    /// Logs degenerate but legal settings
    ///
    /// A zero capacity rejects everything; a zero rate never refills.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            tracing::warn!("Rate limit capacity is 0: every request will be rejected");
        }
        if self.refill_rate == 0 {
            tracing::warn!(
                capacity = self.capacity,
                "Rate limit refill rate is 0: bucket will never refill"
            );
        }
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole request/response exchange
    pub request_timeout: Duration,
    /// Drain window after a shutdown signal
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `TOLLGATE_*` server variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let request_timeout = parse_var::<u64>(&lookup, ENV_REQUEST_TIMEOUT_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let shutdown_timeout = parse_var::<u64>(&lookup, ENV_SHUTDOWN_TIMEOUT_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_timeout);

        Ok(Self {
            host: lookup(ENV_HOST).unwrap_or(defaults.host),
            port: parse_var(&lookup, ENV_PORT)?.unwrap_or(defaults.port),
            request_timeout,
            shutdown_timeout,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::Validation("host cannot be empty".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(AppError::Validation(
                "request timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string suitable for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

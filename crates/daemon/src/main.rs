//! Tollgate - Main Entry Point
//! Rate-limited HTTP server: token bucket admission filter + demo handler

mod signal;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use tollgate_api_http::{HttpServer, RateLimitStats};
use tollgate_core::application::shutdown_channel;
use tollgate_core::config::{RateLimitConfig, ServerConfig};
use tollgate_core::domain::TokenBucket;
use tollgate_core::port::SystemTimeProvider;

use crate::signal::{spawn_signal_listener, SignalListener};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOG_FILTER: &str = "tollgate=info,tower_http=debug";

/// Command-line flags; every flag overrides its `TOLLGATE_*` variable
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "HTTP server with token-bucket rate limiting", long_about = None)]
#[command(version)]
struct Args {
    /// Bucket capacity (maximum burst)
    #[arg(short, long)]
    capacity: Option<u64>,

    /// Tokens added per elapsed second
    #[arg(short, long)]
    rate: Option<u64>,

    /// Host to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Request timeout in seconds
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Drain window after a shutdown signal, in seconds
    #[arg(long)]
    shutdown_timeout_secs: Option<u64>,
}

impl Args {
    fn rate_limit_config(&self) -> Result<RateLimitConfig> {
        let mut config = RateLimitConfig::from_env().context("Invalid rate limit environment")?;
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(rate) = self.rate {
            config.refill_rate = rate;
        }
        config.validate()?;
        Ok(config)
    }

    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::from_env().context("Invalid server environment")?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = std::time::Duration::from_secs(secs);
        }
        if let Some(secs) = self.shutdown_timeout_secs {
            config.shutdown_timeout = std::time::Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("TOLLGATE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    init_logging()?;
    info!("Tollgate v{} starting...", VERSION);

    // 2. Load configuration (env, then flags)
    let args = Args::parse();
    let rate_limit = args.rate_limit_config()?;
    let server_config = args.server_config()?;

    info!(
        capacity = rate_limit.capacity,
        refill_rate = rate_limit.refill_rate,
        "Initializing token bucket"
    );

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider::new());
    let bucket = Arc::new(TokenBucket::from_config(&rate_limit, time_provider));
    let stats = Arc::new(RateLimitStats::new());

    // 4. Bind HTTP server (fatal on failure)
    let server = HttpServer::bind(&server_config, bucket.clone(), stats.clone())
        .await
        .context("HTTP server bind failed")?;

    // 5. Install signal handlers before serving
    let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
    let listener = SignalListener::register().context("Failed to install signal handlers")?;
    let signal_handle = spawn_signal_listener(listener, shutdown_tx);

    // 6. Serve
    let mut server_handle = tokio::spawn(server.serve(shutdown_rx.clone()));

    info!("Waiting for shutdown signal (Ctrl+C, SIGTERM, SIGHUP, SIGQUIT)");

    tokio::select! {
        _ = shutdown_rx.wait() => {
            info!("Shutting down, draining in-flight requests...");
            match tokio::time::timeout(server_config.shutdown_timeout, &mut server_handle).await {
                Ok(joined) => joined.context("HTTP server task panicked")??,
                Err(_) => warn!(
                    timeout_secs = server_config.shutdown_timeout.as_secs(),
                    "Drain timed out, exiting with requests in flight"
                ),
            }
        }
        joined = &mut server_handle => {
            // Server stopped without a shutdown request
            signal_handle.abort();
            joined.context("HTTP server task panicked")??;
        }
    }

    let admission = stats.snapshot();
    info!(
        admitted = admission.admitted,
        rejected = admission.rejected,
        tokens_left = bucket.snapshot().tokens,
        "Shutdown complete."
    );

    Ok(())
}

//! HTTP Server
//!
//! Binds the listener, assembles the middleware stack and serves until the
//! shutdown token fires.

use crate::error::ServerError;
use crate::handler::home_page;
use crate::rate_limit::{RateLimitLayer, RateLimitStats};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tollgate_core::application::ShutdownToken;
use tollgate_core::config::ServerConfig;
use tollgate_core::port::AdmissionPolicy;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router
///
/// Layer order (outermost first): tracing, request timeout, admission
/// filter, then the demo handler for every method and path.
pub fn router(
    policy: Arc<dyn AdmissionPolicy>,
    stats: Arc<RateLimitStats>,
    request_timeout: Duration,
) -> Router {
    Router::new().fallback(home_page).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(request_timeout))
            .layer(RateLimitLayer::with_stats(policy, stats)),
    )
}

/// HTTP Server bound to a local address
pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Router,
}

impl HttpServer {
    /// Bind the listening socket
    ///
    /// A bind failure is returned as [`ServerError::Bind`] and is meant to be
    /// fatal to the caller.
    pub async fn bind(
        config: &ServerConfig,
        policy: Arc<dyn AdmissionPolicy>,
        stats: Arc<RateLimitStats>,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_addr();

        info!(
            host = %config.host,
            port = config.port,
            request_timeout_secs = config.request_timeout.as_secs(),
            "Binding HTTP server"
        );

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            local_addr,
            app: router(policy, stats, config.request_timeout),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` fires, then drain in-flight requests
    pub async fn serve(self, mut shutdown: ShutdownToken) -> Result<(), ServerError> {
        let addr = self.local_addr;
        info!(%addr, "HTTP server listening");

        axum::serve(
            self.listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.wait().await;
            info!("Shutdown requested, no longer accepting connections");
        })
        .await
        .map_err(|source| ServerError::Serve { addr, source })?;

        info!(%addr, "HTTP server stopped");
        Ok(())
    }
}

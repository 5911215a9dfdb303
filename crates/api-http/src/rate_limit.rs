//! Rate Limiting Filter
//!
//! Tower middleware that asks an [`AdmissionPolicy`] for a token before
//! every request. Rejected requests get an immediate 429 and never reach the
//! wrapped service. Because the filter is itself a `Service`, filters stack.

use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::{self, Either, Ready};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tollgate_core::port::AdmissionPolicy;
use tower::{Layer, Service};
use tracing::warn;

/// Body of every rejection response
pub const REJECTION_BODY: &str = "429 - Too Many Requests!";

/// Admission counters shared by every clone of the filter
#[derive(Debug, Default)]
pub struct RateLimitStats {
    admitted: AtomicU64,
    rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatsSnapshot {
    pub admitted: u64,
    pub rejected: u64,
}

impl RateLimitStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RateLimitStatsSnapshot {
        RateLimitStatsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }
}

/// Builds the 429 response
pub fn too_many_requests() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, REJECTION_BODY).into_response()
}

/// Layer wrapping services in [`RateLimitService`]
#[derive(Clone)]
pub struct RateLimitLayer {
    policy: Arc<dyn AdmissionPolicy>,
    stats: Arc<RateLimitStats>,
}

impl RateLimitLayer {
    pub fn new(policy: Arc<dyn AdmissionPolicy>) -> Self {
        Self::with_stats(policy, Arc::new(RateLimitStats::new()))
    }

    /// Share externally owned counters (e.g. to report them at shutdown)
    pub fn with_stats(policy: Arc<dyn AdmissionPolicy>, stats: Arc<RateLimitStats>) -> Self {
        Self { policy, stats }
    }

    pub fn stats(&self) -> Arc<RateLimitStats> {
        Arc::clone(&self.stats)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            policy: Arc::clone(&self.policy),
            stats: Arc::clone(&self.stats),
        }
    }
}

/// Admission filter in front of `S`
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    policy: Arc<dyn AdmissionPolicy>,
    stats: Arc<RateLimitStats>,
}

impl<S, B> Service<Request<B>> for RateLimitService<S>
where
    S: Service<Request<B>, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Either<Ready<Result<Response, S::Error>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        if !self.policy.try_acquire() {
            self.stats.record_rejected();
            let peer = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            warn!(
                host = %client_host(&req),
                peer = ?peer,
                method = %req.method(),
                path = %req.uri().path(),
                "Dropped request"
            );
            return Either::Left(future::ready(Ok(too_many_requests())));
        }

        self.stats.record_admitted();
        Either::Right(self.inner.call(req))
    }
}

fn client_host<B>(req: &Request<B>) -> &str {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())
        .unwrap_or("-")
}

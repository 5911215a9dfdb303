//! Demo Handler
//!
//! Static page served for every method and path once a request has been
//! admitted.

use axum::http::{header, HeaderMap};
use tracing::info;

pub const HOME_PAGE_BODY: &str = "Home Page";

/// Fallback handler: 200 with a fixed body
pub async fn home_page(headers: HeaderMap) -> &'static str {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    info!(host = %host, "Received request");
    HOME_PAGE_BODY
}

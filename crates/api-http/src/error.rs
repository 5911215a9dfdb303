//! HTTP Server Error Types

use std::net::SocketAddr;
use thiserror::Error;

/// Transport-level failures of the HTTP server
///
/// Both variants are fatal to the process; nothing here is retried.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server on {addr} failed: {source}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

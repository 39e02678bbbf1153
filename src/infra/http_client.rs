//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound clients (user center, region oracle) are built here so they share
//! the same connect and request timeouts. The tighter per-call budget is
//! enforced by the validator; the client-level timeout only caps requests made
//! outside of it.

use reqwest::Client;
use std::time::Duration;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout (total request/response time).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build an HTTP client with default timeouts, returning Result so startup can
/// report a TLS misconfiguration instead of panicking.
pub fn try_build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}

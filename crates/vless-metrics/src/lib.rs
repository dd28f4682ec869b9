//! Metrics collection and Prometheus exporter for vless-rs.
//!
//! Recording functions are cheap no-ops until a recorder is installed, so
//! they can be called unconditionally from hot paths and tests.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub use vless_core::errors::*;

/// Initialize Prometheus metrics exporter.
///
/// Starts an HTTP server on the given address to expose metrics.
/// Must be called from within a tokio runtime.
pub fn init_prometheus(listen: &str) -> Result<(), String> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| format!("invalid metrics listen address: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {}", e))?;

    Ok(())
}

// ============================================================================
// Metric Names
// ============================================================================

/// Total number of TCP connections accepted by the listener.
pub const CONNECTIONS_TOTAL: &str = "vless_connections_total";
/// Total number of connections rejected (max connections).
pub const CONNECTIONS_REJECTED_TOTAL: &str = "vless_connections_rejected_total";
/// Total number of relay sessions started (after WebSocket upgrade).
pub const SESSIONS_TOTAL: &str = "vless_sessions_total";
/// Number of currently active relay sessions.
pub const SESSIONS_ACTIVE: &str = "vless_sessions_active";
/// Session duration histogram (seconds).
pub const SESSION_DURATION_SECONDS: &str = "vless_session_duration_seconds";
/// Total number of rejected identifiers.
pub const AUTH_FAILURE_TOTAL: &str = "vless_auth_failure_total";
/// Total number of destination connections opened.
pub const TARGET_CONNECTIONS_TOTAL: &str = "vless_target_connections_total";
/// Destination connect duration histogram (seconds).
pub const TARGET_CONNECT_DURATION_SECONDS: &str = "vless_target_connect_duration_seconds";
/// Total bytes received from clients (forwarded to destinations).
pub const BYTES_UPSTREAM_TOTAL: &str = "vless_bytes_upstream_total";
/// Total bytes received from destinations (forwarded to clients).
pub const BYTES_DOWNSTREAM_TOTAL: &str = "vless_bytes_downstream_total";
/// Total number of plain HTTP pages served, by page.
pub const HTTP_PAGES_TOTAL: &str = "vless_http_pages_total";
/// Total number of errors by type.
pub const ERRORS_TOTAL: &str = "vless_errors_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

#[inline]
pub fn record_connection_accepted() {
    counter!(CONNECTIONS_TOTAL).increment(1);
}

#[inline]
pub fn record_connection_rejected(reason: &'static str) {
    counter!(CONNECTIONS_REJECTED_TOTAL, "reason" => reason).increment(1);
}

#[inline]
pub fn record_session_started() {
    counter!(SESSIONS_TOTAL).increment(1);
    gauge!(SESSIONS_ACTIVE).increment(1.0);
}

#[inline]
pub fn record_session_closed(duration_secs: f64) {
    gauge!(SESSIONS_ACTIVE).decrement(1.0);
    histogram!(SESSION_DURATION_SECONDS).record(duration_secs);
}

#[inline]
pub fn record_auth_failure() {
    counter!(AUTH_FAILURE_TOTAL).increment(1);
}

#[inline]
pub fn record_target_connected(duration_secs: f64) {
    counter!(TARGET_CONNECTIONS_TOTAL).increment(1);
    histogram!(TARGET_CONNECT_DURATION_SECONDS).record(duration_secs);
}

#[inline]
pub fn record_bytes_upstream(bytes: u64) {
    counter!(BYTES_UPSTREAM_TOTAL).increment(bytes);
}

#[inline]
pub fn record_bytes_downstream(bytes: u64) {
    counter!(BYTES_DOWNSTREAM_TOTAL).increment(bytes);
}

#[inline]
pub fn record_http_page(page: &'static str) {
    counter!(HTTP_PAGES_TOTAL, "page" => page).increment(1);
}

/// Record an error by type (one of the `ERROR_*` labels).
#[inline]
pub fn record_error(error_type: &'static str) {
    counter!(ERRORS_TOTAL, "type" => error_type).increment(1);
}

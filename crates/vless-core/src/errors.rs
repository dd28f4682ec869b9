//! Error type constants for metrics and logging.
//!
//! These constants provide consistent error classification across all crates.

/// Protocol parsing/validation error.
pub const ERROR_PROTOCOL: &str = "protocol";
/// Authentication error.
pub const ERROR_AUTH: &str = "auth";
/// Destination connect error (refused, unreachable, resolve failure).
pub const ERROR_CONNECT: &str = "connect";
/// Timeout error.
pub const ERROR_TIMEOUT: &str = "timeout";
/// I/O error.
pub const ERROR_IO: &str = "io";
/// WebSocket upgrade error.
pub const ERROR_WEBSOCKET: &str = "websocket";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";

//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Listener Defaults
// ============================================================================

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
/// Default TCP listener backlog.
pub const DEFAULT_CONNECTION_BACKLOG: u32 = 1024;
/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Session Defaults
// ============================================================================

/// Default time allowed for the first (handshake) frame, in seconds.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
/// Default destination connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default time allowed for closing a channel after the relay ends, in milliseconds.
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 2000;

// ============================================================================
// Buffer/Size Defaults
// ============================================================================

/// Default maximum HTTP request head bytes before the upgrade is rejected.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8192;
/// Default relay buffer size for destination reads (32 KiB).
pub const DEFAULT_RELAY_BUFFER_SIZE: usize = 32768;
/// Minimum accepted relay buffer size.
pub const MIN_RELAY_BUFFER_SIZE: usize = 1024;
/// Maximum accepted relay buffer size.
pub const MAX_RELAY_BUFFER_SIZE: usize = 1024 * 1024;
/// Default TCP socket send buffer size (0 = OS default).
pub const DEFAULT_TCP_SEND_BUFFER: usize = 0;
/// Default TCP socket receive buffer size (0 = OS default).
pub const DEFAULT_TCP_RECV_BUFFER: usize = 0;

// ============================================================================
// TCP Socket Defaults
// ============================================================================

/// Default TCP_NODELAY (disable Nagle's algorithm for lower latency).
pub const DEFAULT_TCP_NO_DELAY: bool = true;

// ============================================================================
// WebSocket Defaults
// ============================================================================

/// Default WebSocket path.
pub const DEFAULT_WS_PATH: &str = "/";
/// Default max WebSocket frame size.
pub const DEFAULT_WS_MAX_FRAME_BYTES: usize = 1 << 20;

// ============================================================================
// HTTP Surface
// ============================================================================

/// Body returned for plain (non-upgrade) HTTP requests.
pub const STATUS_PAGE_BODY: &str = "System Running...";
/// Port advertised in generated share links (the TLS front).
pub const DEFAULT_SHARE_PORT: u16 = 443;

//! Configuration type definitions for server, auth, WebSocket, metrics, and logging.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Time allowed for the handshake frame after the upgrade.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Upper bound on resolving and connecting to a destination.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Maximum HTTP request head size before the connection is dropped.
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
    /// Maximum concurrent connections (None = unlimited)
    #[serde(default)]
    pub max_connections: Option<usize>,
    /// Read buffer size for the destination-to-client direction.
    #[serde(default = "default_relay_buffer_size")]
    pub relay_buffer_size: usize,
    /// TCP socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_header_bytes: default_max_header_bytes(),
            max_connections: None,
            relay_buffer_size: default_relay_buffer_size(),
            tcp: TcpConfig::default(),
        }
    }
}

/// TCP socket configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    /// Disable Nagle's algorithm (TCP_NODELAY) on both legs.
    #[serde(default = "default_tcp_no_delay")]
    pub no_delay: bool,
    /// Outbound socket send buffer size (SO_SNDBUF). If 0, uses OS default.
    #[serde(default = "default_tcp_send_buffer")]
    pub send_buffer: usize,
    /// Outbound socket receive buffer size (SO_RCVBUF). If 0, uses OS default.
    #[serde(default = "default_tcp_recv_buffer")]
    pub recv_buffer: usize,
    /// TCP listener backlog (pending connections queue size).
    #[serde(default = "default_connection_backlog")]
    pub backlog: u32,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            no_delay: default_tcp_no_delay(),
            send_buffer: default_tcp_send_buffer(),
            recv_buffer: default_tcp_recv_buffer(),
            backlog: default_connection_backlog(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The deployment credential (UUID, with or without hyphens).
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Path on which upgrades are accepted.
    #[serde(default = "default_ws_path")]
    pub path: String,
    /// Expected Host header; also used in generated share links.
    #[serde(default)]
    pub host: Option<String>,
    /// Maximum frame/message size, 0 = library default.
    #[serde(default = "default_ws_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            path: default_ws_path(),
            host: None,
            max_frame_bytes: default_ws_max_frame_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus exporter listen address; disabled when unset.
    pub listen: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error. Default: info
    pub level: Option<String>,
    /// Output format: json, pretty, compact. Default: pretty
    pub format: Option<String>,
    /// Output target: stdout, stderr. Default: stderr
    pub output: Option<String>,
    /// Per-module log level overrides, e.g. `vless_server = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

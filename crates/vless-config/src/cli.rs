//! Command-line and environment overrides.

use clap::Parser;

use crate::Config;

/// Settings that can be given on the command line or through the environment.
///
/// Overrides are applied on top of the config file (or the defaults when no
/// file is given).
#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override server listen address, e.g. 0.0.0.0:8080
    #[arg(long, env = "VLESS_LISTEN")]
    pub listen: Option<String>,
    /// Deployment credential (UUID)
    #[arg(long, env = "VLESS_UUID", hide_env_values = true)]
    pub uuid: Option<String>,
    /// Override handshake timeout (seconds)
    #[arg(long, env = "VLESS_HANDSHAKE_TIMEOUT_SECS")]
    pub handshake_timeout_secs: Option<u64>,
    /// Override destination connect timeout (seconds)
    #[arg(long, env = "VLESS_CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: Option<u64>,
    /// Override maximum HTTP request head bytes
    #[arg(long)]
    pub max_header_bytes: Option<usize>,
    /// Override maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "VLESS_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,
    /// Buffer size for destination reads (bytes)
    #[arg(long)]
    pub relay_buffer_size: Option<usize>,
    /// WebSocket path
    #[arg(long, env = "VLESS_WS_PATH")]
    pub ws_path: Option<String>,
    /// WebSocket host (optional)
    #[arg(long, env = "VLESS_WS_HOST")]
    pub ws_host: Option<String>,
    /// WebSocket max frame bytes
    #[arg(long)]
    pub ws_max_frame_bytes: Option<usize>,
    /// Override metrics listen address
    #[arg(long, env = "VLESS_METRICS_LISTEN")]
    pub metrics_listen: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long, env = "VLESS_LOG_LEVEL")]
    pub log_level: Option<String>,
    /// Override log format (pretty/compact/json)
    #[arg(long, env = "VLESS_LOG_FORMAT")]
    pub log_format: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.listen {
        config.server.listen = v.clone();
    }
    if let Some(v) = &overrides.uuid {
        config.auth.uuid = Some(v.clone());
    }
    if let Some(v) = overrides.handshake_timeout_secs {
        config.server.handshake_timeout_secs = v;
    }
    if let Some(v) = overrides.connect_timeout_secs {
        config.server.connect_timeout_secs = v;
    }
    if let Some(v) = overrides.max_header_bytes {
        config.server.max_header_bytes = v;
    }
    if let Some(v) = overrides.max_connections {
        config.server.max_connections = if v == 0 { None } else { Some(v) };
    }
    if let Some(v) = overrides.relay_buffer_size {
        config.server.relay_buffer_size = v;
    }
    if let Some(v) = &overrides.ws_path {
        config.websocket.path = v.clone();
    }
    if let Some(v) = &overrides.ws_host {
        config.websocket.host = Some(v.clone());
    }
    if let Some(v) = overrides.ws_max_frame_bytes {
        config.websocket.max_frame_bytes = v;
    }
    if let Some(v) = &overrides.metrics_listen {
        config.metrics.listen = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
    if let Some(v) = &overrides.log_format {
        config.logging.format = Some(v.clone());
    }
}

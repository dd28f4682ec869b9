//! Configuration validation logic.

use std::net::SocketAddr;

use vless_core::defaults::{MAX_RELAY_BUFFER_SIZE, MIN_RELAY_BUFFER_SIZE};
use vless_proto::MIN_HEADER_LEN;

use crate::Config;
use crate::loader::ConfigError;

/// Smallest request head we can still inspect for an upgrade.
const MIN_HEADER_BYTES: usize = 256;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.listen.trim().is_empty() {
        return Err(ConfigError::Validation("server.listen is empty".into()));
    }
    if config.server.listen.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Validation(format!(
            "server.listen is not a socket address: {}",
            config.server.listen
        )));
    }
    // Surfaces both a missing and a malformed uuid.
    config.credential()?;
    if config.server.handshake_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "server.handshake_timeout_secs must be > 0".into(),
        ));
    }
    if config.server.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "server.connect_timeout_secs must be > 0".into(),
        ));
    }
    if config.server.max_header_bytes < MIN_HEADER_BYTES {
        return Err(ConfigError::Validation(format!(
            "server.max_header_bytes too small (min {MIN_HEADER_BYTES})"
        )));
    }
    if config.server.relay_buffer_size < MIN_RELAY_BUFFER_SIZE {
        return Err(ConfigError::Validation(format!(
            "server.relay_buffer_size must be >= {MIN_RELAY_BUFFER_SIZE}"
        )));
    }
    if config.server.relay_buffer_size > MAX_RELAY_BUFFER_SIZE {
        return Err(ConfigError::Validation(
            "server.relay_buffer_size must be <= 1MB".into(),
        ));
    }
    if config.server.tcp.backlog == 0 {
        return Err(ConfigError::Validation("server.tcp.backlog must be > 0".into()));
    }
    if !config.websocket.path.starts_with('/') {
        return Err(ConfigError::Validation(
            "websocket.path must start with '/'".into(),
        ));
    }
    if config.websocket.max_frame_bytes != 0 && config.websocket.max_frame_bytes < MIN_HEADER_LEN {
        return Err(ConfigError::Validation(format!(
            "websocket.max_frame_bytes too small (min {MIN_HEADER_LEN})"
        )));
    }
    if let Some(listen) = &config.metrics.listen
        && listen.parse::<SocketAddr>().is_err()
    {
        return Err(ConfigError::Validation(format!(
            "metrics.listen is not a socket address: {listen}"
        )));
    }
    let formats = ["pretty", "compact", "json"];
    if let Some(format) = config.logging.format.as_deref()
        && !formats.contains(&format)
    {
        return Err(ConfigError::Validation(format!(
            "logging.format must be one of: {formats:?}"
        )));
    }
    let outputs = ["stdout", "stderr"];
    if let Some(output) = config.logging.output.as_deref()
        && !outputs.contains(&output)
    {
        return Err(ConfigError::Validation(format!(
            "logging.output must be one of: {outputs:?}"
        )));
    }
    Ok(())
}

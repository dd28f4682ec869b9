//! Configuration loading and CLI definitions.
//!
//! A config file is optional: every field has a default, and the credential
//! and listen address are usually supplied through the environment
//! (`VLESS_UUID`, `VLESS_LISTEN`) via [`CliOverrides`].

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config};
pub use types::{
    AuthConfig, Config, LoggingConfig, MetricsConfig, ServerConfig, TcpConfig, WebSocketConfig,
};
pub use validate::validate_config;

use vless_auth::Credential;

impl Config {
    /// Parse the configured credential.
    pub fn credential(&self) -> Result<Credential, ConfigError> {
        let raw = self
            .auth
            .uuid
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::Validation("auth.uuid is not set".into()))?;
        raw.parse()
            .map_err(|e| ConfigError::Validation(format!("auth.uuid: {e}")))
    }
}

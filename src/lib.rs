//! # vless-rs
//!
//! A WebSocket tunneling relay speaking the VLESS handshake.
//!
//! ## Crates
//!
//! - [`vless_core`] - Defaults, error labels, I/O and transport adapters
//! - [`vless_proto`] - Handshake parsing and serialization
//! - [`vless_auth`] - Credential parsing and constant-time verification
//! - [`vless_config`] - Configuration loading and validation
//! - [`vless_metrics`] - Prometheus-compatible metrics
//! - [`vless_server`] - Listener, relay sessions and dispatcher

pub use vless_auth as auth;
pub use vless_config as config;
pub use vless_core as core;
pub use vless_metrics as metrics;
pub use vless_proto as proto;
pub use vless_server as server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use vless_auth::{Credential, CredentialGuard};
    pub use vless_config::{Config, load_config, validate_config};
    pub use vless_server::{
        CancellationToken, Dispatcher, ServerError, SessionError, run, run_with_shutdown,
    };
}

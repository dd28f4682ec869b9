//! Server and session error types.

use std::io;

use vless_auth::AuthError;
use vless_metrics::{
    ERROR_AUTH, ERROR_CONFIG, ERROR_CONNECT, ERROR_IO, ERROR_PROTOCOL, ERROR_TIMEOUT,
    ERROR_WEBSOCKET,
};
use vless_proto::ParseError;

/// Listener-level error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("websocket: {0}")]
    WebSocket(String),
    #[error("request head timed out")]
    HeadTimeout,
}

impl ServerError {
    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Io(_) => ERROR_IO,
            ServerError::Config(_) => ERROR_CONFIG,
            ServerError::WebSocket(_) => ERROR_WEBSOCKET,
            ServerError::HeadTimeout => ERROR_TIMEOUT,
        }
    }
}

/// Why a relay session ended early.
///
/// None of these are reported to the peer; the channel is simply closed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("proto: {0}")]
    Protocol(#[from] ParseError),
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("connect: {0}")]
    Connect(io::Error),
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("handshake timed out")]
    HandshakeTimeout,
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            SessionError::Protocol(_) => ERROR_PROTOCOL,
            SessionError::Auth(_) => ERROR_AUTH,
            SessionError::Connect(_) => ERROR_CONNECT,
            SessionError::ConnectTimeout | SessionError::HandshakeTimeout => ERROR_TIMEOUT,
            SessionError::Io(_) => ERROR_IO,
        }
    }

    /// Classify a connector failure.
    pub(crate) fn from_connect(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::TimedOut {
            SessionError::ConnectTimeout
        } else {
            SessionError::Connect(err)
        }
    }
}

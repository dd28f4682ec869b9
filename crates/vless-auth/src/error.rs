//! Authentication error types.

/// Authentication error.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The presented identifier does not match the configured credential.
    #[error("invalid credential")]
    Invalid,

    /// The configured credential could not be parsed.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),
}

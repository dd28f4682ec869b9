//! Credential handling for vless.
//!
//! A deployment is configured with a single UUID. Every session presents a
//! 16-byte identifier in its handshake, which must match that UUID exactly.
//!
//! # Example
//!
//! ```
//! use vless_auth::{Credential, CredentialGuard};
//!
//! let credential: Credential = "90cd2451-9316-43f1-b1e1-123456789abc".parse().unwrap();
//! let guard = CredentialGuard::new(credential);
//!
//! assert!(guard.verify(credential.as_bytes()).is_ok());
//! assert!(guard.verify(&[0u8; 16]).is_err());
//! ```

mod credential;
mod error;
mod guard;

pub use credential::{Credential, ID_LEN};
pub use error::AuthError;
pub use guard::CredentialGuard;

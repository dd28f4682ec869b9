//! Constant-time identifier verification.

use subtle::ConstantTimeEq;

use crate::credential::Credential;
use crate::error::AuthError;

/// Verifies handshake identifiers against the configured credential.
///
/// The comparison runs over all bytes regardless of where the first mismatch
/// is, so response timing does not reveal how much of a guess was right.
#[derive(Debug, Clone)]
pub struct CredentialGuard {
    credential: Credential,
}

impl CredentialGuard {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Check a candidate identifier. Candidates of the wrong length fail.
    #[inline]
    pub fn verify(&self, candidate: &[u8]) -> Result<(), AuthError> {
        if bool::from(self.credential.as_bytes()[..].ct_eq(candidate)) {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

//! The configured 16-byte credential.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;
pub use vless_proto::ID_LEN;

use crate::error::AuthError;

/// A deployment credential.
///
/// Parsed from a UUID string with or without hyphens. `Debug` does not print
/// the value since the identifier doubles as a bearer secret.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credential([u8; ID_LEN]);

impl Credential {
    #[inline]
    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a random (version 4) credential.
    pub fn generate() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

impl FromStr for Credential {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Only the canonical hyphenated (36) and simple (32) forms are accepted.
        if s.len() != 36 && s.len() != 32 {
            return Err(AuthError::MalformedCredential(format!(
                "expected 32 or 36 characters, got {}",
                s.len()
            )));
        }
        Uuid::parse_str(s)
            .map(|uuid| Self(*uuid.as_bytes()))
            .map_err(|e| AuthError::MalformedCredential(e.to_string()))
    }
}

/// Canonical lowercase hyphenated form.
impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Uuid::from_bytes(self.0).hyphenated(), f)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hyphenated_and_simple_forms() {
        let a: Credential = "90cd2451-9316-43f1-b1e1-123456789abc".parse().unwrap();
        let b: Credential = "90cd2451931643f1b1e1123456789abc".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes()[0], 0x90);
        assert_eq!(a.as_bytes()[15], 0xbc);
    }

    #[test]
    fn accepts_uppercase_and_whitespace() {
        let a: Credential = " 90CD2451-9316-43F1-B1E1-123456789ABC\n".parse().unwrap();
        assert_eq!(a.to_string(), "90cd2451-9316-43f1-b1e1-123456789abc");
    }

    #[test]
    fn rejects_malformed() {
        assert!("".parse::<Credential>().is_err());
        assert!("not-a-uuid".parse::<Credential>().is_err());
        assert!("90cd2451-9316-43f1-b1e1-123456789abz".parse::<Credential>().is_err());
        assert!("{90cd2451-9316-43f1-b1e1-123456789abc}".parse::<Credential>().is_err());
    }

    #[test]
    fn generated_credentials_roundtrip_through_text() {
        let c = Credential::generate();
        let parsed: Credential = c.to_string().parse().unwrap();
        assert_eq!(c, parsed);
        assert_ne!(c, Credential::generate());
    }

    #[test]
    fn credential_fits_wire_identifier() {
        let c: Credential = "90cd2451-9316-43f1-b1e1-123456789abc".parse().unwrap();
        let wire: &[u8; vless_proto::ID_LEN] = c.as_bytes();
        assert_eq!(wire.len(), ID_LEN);
    }

    #[test]
    fn debug_hides_value() {
        let c = Credential::from_bytes([0xab; ID_LEN]);
        assert_eq!(format!("{c:?}"), "Credential(..)");
    }
}

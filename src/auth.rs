//! Shared-password gate in front of the chat.

use crate::error::AuthError;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare a submitted secret against the configured one in constant time.
///
/// Both sides are hashed first so the comparison always runs over 32 bytes,
/// independent of either input's length or of how long a prefix matches.
pub fn verify(submitted: &str, configured: &str) -> bool {
    let submitted = Sha256::digest(submitted.as_bytes());
    let configured = Sha256::digest(configured.as_bytes());
    submitted.as_slice().ct_eq(configured.as_slice()).into()
}

/// Holds the configured password for the lifetime of the server.
#[derive(Clone)]
pub struct CredentialGate {
    secret: String,
}

impl CredentialGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Check a login attempt. The submitted value is consumed and dropped here.
    pub fn check(&self, submitted: String) -> Result<(), AuthError> {
        if verify(&submitted, &self.secret) {
            Ok(())
        } else {
            Err(AuthError::IncorrectPassword)
        }
    }
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate")
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_secret_verifies() {
        assert!(verify("abc", "abc"));
    }

    #[test]
    fn mismatches_are_rejected() {
        for candidate in ["", "a", "ab", "abd", "abcd", "ABC", " abc", "abc "] {
            assert!(!verify(candidate, "abc"), "{candidate:?} should not verify");
        }
    }

    #[test]
    fn empty_configured_secret_only_matches_empty() {
        assert!(verify("", ""));
        assert!(!verify("x", ""));
    }

    #[test]
    fn gate_maps_mismatch_to_auth_error() {
        let gate = CredentialGate::new("abc");
        assert_eq!(gate.check("abc".into()), Ok(()));
        assert_eq!(gate.check("nope".into()), Err(AuthError::IncorrectPassword));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let gate = CredentialGate::new("hunter2");
        let rendered = format!("{gate:?}");
        assert!(!rendered.contains("hunter2"));
    }
}

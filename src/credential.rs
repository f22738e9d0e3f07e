//! Opaque credential material and pluggable verification.
//!
//! The engine never interprets credential bytes. It stores whatever the
//! loader hands it (a password hash, a token digest, a raw secret in tests)
//! and asks a [`CredentialVerifier`] whether a presented secret matches.
//! Hash-algorithm selection lives outside the engine: a verifier that hashes
//! the presented bytes before comparing is a drop-in replacement for the
//! default.
//!
//! ## Example Usage
//!
//! ```
//! use hotrank::credential::{ConstantTimeVerifier, Credential, CredentialVerifier};
//!
//! let stored = Credential::from("s3cret");
//! let verifier = ConstantTimeVerifier;
//! assert!(verifier.verify(&stored, b"s3cret"));
//! assert!(!verifier.verify(&stored, b"guess"));
//!
//! // Debug output never leaks the secret.
//! assert_eq!(format!("{stored:?}"), "Credential(<6 bytes>)");
//! ```

use std::fmt;

use subtle::ConstantTimeEq;

/// Immutable secret bytes attached to a record.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Box<[u8]>);

impl Credential {
    /// Wraps raw credential bytes.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the stored bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the number of stored bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the credential is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&String> for Credential {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&[u8]> for Credential {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl From<Vec<u8>> for Credential {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

/// Decides whether a presented secret matches a stored credential.
///
/// Implementations must be pure: the same inputs always give the same answer,
/// and verification never touches engine state.
pub trait CredentialVerifier: Send + Sync + fmt::Debug {
    fn verify(&self, stored: &Credential, presented: &[u8]) -> bool;
}

/// Byte equality via [`subtle::ConstantTimeEq`]: running time does not
/// depend on where the first mismatch occurs. A length mismatch is rejected
/// without comparing contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantTimeVerifier;

impl CredentialVerifier for ConstantTimeVerifier {
    fn verify(&self, stored: &Credential, presented: &[u8]) -> bool {
        bool::from(stored.as_bytes().ct_eq(presented))
    }
}

//! Error types for the hotrank engine.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when engine configuration parameters are invalid
//!   (e.g. a zero reorganize threshold).
//! - [`DuplicateIdentity`]: Returned by batch inserts that collide with a live
//!   record or with another item of the same batch.
//! - [`AuthError`]: The recoverable failures of `authenticate`.
//! - [`InvariantError`]: Returned when a published ranking violates its
//!   ordering invariants (test and fuzz helpers).
//!
//! ## Example Usage
//!
//! ```
//! use hotrank::{ConfigError, Engine};
//!
//! let engine: Result<Engine, ConfigError> = Engine::try_new(1_000);
//! assert!(engine.is_ok());
//!
//! let bad = Engine::try_new(0);
//! assert!(bad.is_err());
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when ranking invariants are violated.
///
/// Produced by [`RankSnapshot::check_invariants`](crate::rank_view::RankSnapshot::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when engine configuration parameters are invalid.
///
/// Produced by [`Engine::try_new`](crate::Engine::try_new) and
/// [`EngineBuilder::try_build`](crate::EngineBuilder::try_build). Carries a
/// human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use hotrank::Engine;
///
/// let err = Engine::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("reorganize_threshold"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// DuplicateIdentity
// ---------------------------------------------------------------------------

/// A batch insert named an identity that is already live, or named the same
/// identity twice. The whole batch is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate identity `{0}`")]
pub struct DuplicateIdentity(pub String);

impl DuplicateIdentity {
    /// The identity that collided.
    #[inline]
    pub fn identity(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// AuthError
// ---------------------------------------------------------------------------

/// Failed authentication. Neither variant mutates any counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No live record carries the identity.
    #[error("identity not found")]
    NotFound,
    /// The record exists but the presented credential does not match.
    #[error("invalid credential")]
    InvalidCredential,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("rank order broken at 3");
        assert_eq!(err.to_string(), "rank order broken at 3");
    }

    #[test]
    fn invariant_message_accessor() {
        let err = InvariantError::new("test");
        assert_eq!(err.message(), "test");
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("reorganize_threshold must be > 0");
        assert_eq!(err.to_string(), "reorganize_threshold must be > 0");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.message(), "x");
    }

    // -- DuplicateIdentity ------------------------------------------------

    #[test]
    fn duplicate_names_identity() {
        let err = DuplicateIdentity("alice".into());
        assert_eq!(err.identity(), "alice");
        assert_eq!(err.to_string(), "duplicate identity `alice`");
    }

    // -- AuthError --------------------------------------------------------

    #[test]
    fn auth_error_display() {
        assert_eq!(AuthError::NotFound.to_string(), "identity not found");
        assert_eq!(
            AuthError::InvalidCredential.to_string(),
            "invalid credential"
        );
    }

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
        assert_error::<ConfigError>();
        assert_error::<DuplicateIdentity>();
        assert_error::<AuthError>();
    }
}

//! The stored unit: identity, credential, and an atomic query counter.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::credential::{Credential, CredentialVerifier};

/// Shared handle to a live record.
///
/// The index and every published ranking hold handles to the same
/// allocation, so a counter increment is visible through all of them.
pub type RecordHandle = Arc<Record>;

/// A credential record.
///
/// `identity` and `credential` never change after construction. `query_count`
/// only moves up, one step per successful authentication.
pub struct Record {
    identity: Arc<str>,
    credential: Credential,
    query_count: AtomicU64,
}

impl Record {
    pub(crate) fn new(identity: Arc<str>, credential: Credential) -> Self {
        Self {
            identity,
            credential,
            query_count: AtomicU64::new(0),
        }
    }

    /// The unique key of this record.
    #[inline]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[inline]
    pub(crate) fn identity_arc(&self) -> &Arc<str> {
        &self.identity
    }

    /// Current number of successful authentications.
    #[inline]
    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Acquire)
    }

    /// Checks `presented` against the stored credential without counting.
    #[inline]
    pub(crate) fn verify(&self, verifier: &dyn CredentialVerifier, presented: &[u8]) -> bool {
        verifier.verify(&self.credential, presented)
    }

    /// Counts one successful authentication and returns the new count.
    ///
    /// The RMW gives every record a total order of increments, so concurrent
    /// successes on one identity are never lost.
    #[inline]
    pub(crate) fn record_query(&self) -> u64 {
        self.query_count.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("identity", &self.identity)
            .field("credential", &self.credential)
            .field("query_count", &self.query_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::ConstantTimeVerifier;

    fn record(id: &str, pw: &str) -> Record {
        Record::new(Arc::from(id), Credential::from(pw))
    }

    #[test]
    fn new_record_starts_at_zero() {
        let rec = record("alice", "pw");
        assert_eq!(rec.identity(), "alice");
        assert_eq!(rec.query_count(), 0);
    }

    #[test]
    fn record_query_returns_new_count() {
        let rec = record("alice", "pw");
        assert_eq!(rec.record_query(), 1);
        assert_eq!(rec.record_query(), 2);
        assert_eq!(rec.query_count(), 2);
    }

    #[test]
    fn verify_does_not_count() {
        let rec = record("alice", "pw");
        assert!(rec.verify(&ConstantTimeVerifier, b"pw"));
        assert!(!rec.verify(&ConstantTimeVerifier, b"nope"));
        assert_eq!(rec.query_count(), 0);
    }

    #[test]
    fn debug_hides_secret() {
        let rec = record("alice", "topsecret");
        let dbg = format!("{rec:?}");
        assert!(dbg.contains("alice"));
        assert!(!dbg.contains("topsecret"));
    }
}

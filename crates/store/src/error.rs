use thiserror::Error;

use crate::keys::{RepKey, StringKey};

/// Errors raised by the backing tables and the trail.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StoreError {
    /// The `strings` table has no entry under this key.
    #[error("no string {0} in the strings table")]
    StringNotFound(StringKey),
    /// The `reps` table has no entry under this key.
    #[error("no representation {0} in the representations table")]
    RepNotFound(RepKey),
    /// A write stream is already open on this representation in this trail.
    #[error("representation {0} already has an open write stream in this trail")]
    WriteLocked(RepKey),
    /// A read stream was opened on this representation earlier in this
    /// trail; interleaving a writer behind it would invalidate the
    /// reader's size snapshot.
    #[error("representation {0} has an open read stream in this trail")]
    ReadLocked(RepKey),
    /// The backend lost a race with another trail; the attempt can be
    /// replayed through [`run_trail`](crate::run_trail).
    #[error("transient storage conflict: {0}")]
    Transient(String),
}

/// Classifies errors the retry harness may replay.
pub trait Retryable {
    /// Returns `true` when a fresh trail could succeed where this attempt
    /// failed.
    fn is_transient(&self) -> bool;
}

impl Retryable for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

use store::{RepKey, Retryable, StoreError, TxnId};
use thiserror::Error;

/// Errors surfaced by the representation engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A request the engine cannot serve, independent of stored data.
    #[error("representation error: {0}")]
    General(String),
    /// Stored data violates the representation invariants.
    #[error("corrupt representation data: {0}")]
    Corrupt(String),
    /// The representation behind a stream is gone or was never there.
    #[error("representation behind the stream has changed")]
    RepChanged,
    /// The representation is not mutable under the caller's transaction.
    #[error("representation {0} is not mutable under transaction {1}")]
    RepNotMutable(RepKey, TxnId),
    /// The delta generator finished without yielding a content digest.
    #[error("delta generation finished without producing a content checksum")]
    ChecksumAbsent,
    /// The backing tables failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The delta codec failed.
    #[error(transparent)]
    Delta(#[from] svndiff::SvndiffError),
}

impl Retryable for Error {
    fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

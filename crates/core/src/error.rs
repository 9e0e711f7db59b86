//! Error types for Coffer
//!
//! One taxonomy enum shared by every crate in the workspace. Durability
//! failures carry the underlying I/O or serialization error; transaction
//! conflicts and memory-limit rejections are recoverable by the caller.

use crate::value::Kind;
use thiserror::Error;

/// Result type alias using the Coffer [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all Coffer operations
#[derive(Debug, Error)]
pub enum Error {
    /// Read miss: the key is not present in the store
    #[error("key not found")]
    KeyNotFound,

    /// An operation was applied to an entry of the wrong type
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        /// Type the operation required
        expected: Kind,
        /// Type actually stored under the key
        actual: Kind,
    },

    /// Write rejected before mutation: it would exceed the memory budget
    #[error("memory limit exceeded: {requested} bytes requested, {limit} byte limit")]
    MemoryLimitExceeded {
        /// Tracked bytes the store would hold after the write
        requested: u64,
        /// Configured ceiling
        limit: u64,
    },

    /// Transaction staging or commit lost to a concurrent writer
    #[error("write conflict on key {0:?}")]
    WriteConflict(String),

    /// Write attempted through a read-only transaction
    #[error("transaction is read-only")]
    ReadOnlyTransaction,

    /// Operation on a transaction that already committed or aborted
    #[error("transaction already finished")]
    TransactionFinished,

    /// Malformed input value
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// I/O failure from the durability layer
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Encode/decode failure for an on-disk record
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An on-disk record failed validation (bad checksum, bad format tag)
    #[error("corrupt record: {0}")]
    Corruption(String),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the caller can recover by retrying with fresh state
    ///
    /// Conflicts retry with a new transaction; memory rejections retry
    /// after freeing space. Durability and corruption errors are not
    /// retryable by the core's contract.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::WriteConflict(_) | Error::MemoryLimitExceeded { .. }
        )
    }
}

//! Optimistic concurrency control for Coffer
//!
//! One transaction abstraction with snapshot isolation: a transaction
//! observes the store as of its begin point (`read_ts`), stages writes
//! locally, and validates for conflicts at write time (fail fast) and
//! again at commit under a global commit lock (first committer wins).
//!
//! Conflicts are surfaced as [`coffer_core::Error::WriteConflict`] and
//! never retried automatically; the caller decides whether to begin a
//! fresh transaction.

mod context;
mod manager;

pub use context::{Staged, TransactionContext};
pub use manager::{TransactionManager, VersioningPolicy};

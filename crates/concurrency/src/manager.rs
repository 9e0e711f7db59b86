//! Transaction manager
//!
//! Coordinates begin and commit:
//!
//! - `begin_lock` serializes snapshot-point capture so concurrent begins
//!   get monotonically non-decreasing `read_ts` values.
//! - `commit_lock` serializes all commits, making re-validation and
//!   application atomic with respect to other commits.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. acquire commit lock
//! 2. re-validate read set + staged keys (version <= read_ts)
//! 3. IF any violation: abort with WriteConflict, no change
//! 4. allocate one transaction id for the whole batch
//! 5. append one WAL batch (DURABILITY POINT)
//! 6. apply staged writes to the store under the batch id
//! ```
//!
//! The WAL append precedes in-memory application, so a durability
//! failure rejects the commit without leaving the store ahead of disk.
//! A crash after step 5 is recovered by WAL replay.

use crate::context::{Staged, TransactionContext};
use coffer_core::{Entry, Error, Result};
use coffer_durability::{Command, WalEntry, WalWriter};
use coffer_storage::EntryStore;
use parking_lot::Mutex;
use tracing::debug;

/// Version-history policy applied to committed writes
#[derive(Debug, Clone, Copy)]
pub struct VersioningPolicy {
    /// Whether superseded states are pushed onto entry history
    pub keep_versions: bool,
    /// History bound per key; 0 = unlimited
    pub max_versions: usize,
}

impl Default for VersioningPolicy {
    fn default() -> Self {
        VersioningPolicy {
            keep_versions: false,
            max_versions: 0,
        }
    }
}

/// Manages transaction lifecycle and atomic commits
pub struct TransactionManager {
    /// Serializes `read_ts` capture at begin
    begin_lock: Mutex<()>,
    /// Serializes commits; re-validation and apply are atomic under it
    commit_lock: Mutex<()>,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new() -> Self {
        TransactionManager {
            begin_lock: Mutex::new(()),
            commit_lock: Mutex::new(()),
        }
    }

    /// Begin a transaction, capturing the snapshot point
    pub fn begin(&self, store: &EntryStore, writable: bool) -> TransactionContext {
        let _guard = self.begin_lock.lock();
        TransactionContext::new(store.counter(), writable)
    }

    /// Commit a transaction atomically
    ///
    /// Read-only transactions (and writable ones with nothing staged)
    /// succeed as a no-op and return `None`. Otherwise returns the WAL
    /// batch that was logged, carrying the transaction id assigned to
    /// the whole batch.
    ///
    /// On a conflict the transaction aborts with
    /// [`Error::WriteConflict`] and the store is unchanged. On a WAL
    /// failure the commit is rejected before any in-memory change.
    pub fn commit(
        &self,
        ctx: &mut TransactionContext,
        store: &EntryStore,
        wal: &mut WalWriter,
        policy: VersioningPolicy,
    ) -> Result<Option<WalEntry>> {
        if ctx.is_finished() {
            return Err(Error::TransactionFinished);
        }
        if !ctx.is_writable() || ctx.staged_len() == 0 {
            ctx.mark_finished();
            return Ok(None);
        }

        let _commit_guard = self.commit_lock.lock();

        // Re-validate everything observed and everything staged: a
        // concurrent commit may have landed between write and commit.
        let conflict = ctx
            .validation_keys()
            .find(|key| store.version_of(key).unwrap_or(0) > ctx.read_ts())
            .cloned();
        if let Some(key) = conflict {
            ctx.abort();
            return Err(Error::WriteConflict(key));
        }

        // One id for the whole batch. A failure below leaves a gap in the
        // counter; ids are unique, not contiguous.
        let tx_id = store.next_version();
        let mut applies: Vec<(String, Option<Entry>)> = Vec::with_capacity(ctx.staged_len());
        let mut commands = Vec::with_capacity(ctx.staged_len());
        let mut added = 0usize;
        let mut replaced = 0usize;
        for (key, staged) in ctx.staged() {
            let existing = store.get(key);
            replaced += existing.as_ref().map(Entry::approximate_size).unwrap_or(0);
            match staged {
                Staged::Write(value) => {
                    let entry = match &existing {
                        Some(previous) => previous.superseded_by(
                            value.clone(),
                            tx_id,
                            policy.keep_versions,
                            policy.max_versions,
                        ),
                        None => Entry::new(value.clone(), tx_id),
                    };
                    added += entry.approximate_size();
                    commands.push(Command::put(key.clone(), &entry));
                    applies.push((key.clone(), Some(entry)));
                }
                Staged::Delete => {
                    let kind = existing
                        .as_ref()
                        .map(Entry::kind)
                        .unwrap_or(coffer_core::Kind::Scalar);
                    commands.push(Command::delete(key.clone(), tx_id, kind));
                    applies.push((key.clone(), None));
                }
            }
        }
        store.check_memory_budget(added, replaced)?;

        // DURABILITY POINT: the batch must be on stable storage before
        // the store advances.
        let batch = WalEntry::new(tx_id, commands);
        wal.append(&batch)?;

        for (key, entry) in applies {
            match entry {
                Some(entry) => store.insert(key, entry),
                None => {
                    store.remove(&key);
                }
            }
        }

        debug!(tx_id, staged = ctx.staged_len(), "transaction committed");
        ctx.mark_finished();
        Ok(Some(batch))
    }

    /// Abort a transaction, discarding its staged writes
    pub fn abort(&self, ctx: &mut TransactionContext) {
        ctx.abort();
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

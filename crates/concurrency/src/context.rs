//! Transaction context
//!
//! Ephemeral per-transaction state: the read timestamp captured at
//! begin, the locally staged writes, and a cache of the versions
//! observed by reads. Created on begin, destroyed on commit or abort,
//! never persisted.

use coffer_core::{Entry, Error, Result, Value};
use coffer_storage::EntryStore;
use std::collections::{BTreeMap, HashMap};

/// A locally staged operation, invisible to other transactions
#[derive(Debug, Clone, PartialEq)]
pub enum Staged {
    /// Replace the entry's value on commit
    Write(Value),
    /// Remove the key on commit
    Delete,
}

/// Per-transaction state
///
/// Reads are served from the staged writes first, then from the store
/// filtered to versions at or before `read_ts` (the snapshot as of
/// begin). Every read records the observed live version so commit can
/// re-validate the read set.
#[derive(Debug)]
pub struct TransactionContext {
    /// Transaction counter value captured at begin
    read_ts: u64,
    /// Whether writes are permitted
    writable: bool,
    /// Staged operations, keyed by key; ordered for deterministic batches
    staged: BTreeMap<String, Staged>,
    /// Live versions observed by reads; 0 records a miss
    read_versions: HashMap<String, u64>,
    /// Set once the transaction commits or aborts
    finished: bool,
}

impl TransactionContext {
    /// Create a context with the given snapshot point
    pub fn new(read_ts: u64, writable: bool) -> Self {
        TransactionContext {
            read_ts,
            writable,
            staged: BTreeMap::new(),
            read_versions: HashMap::new(),
            finished: false,
        }
    }

    /// The snapshot point captured at begin
    pub fn read_ts(&self) -> u64 {
        self.read_ts
    }

    /// Whether this transaction may stage writes
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether the transaction has committed or aborted
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of staged operations
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Read a key within the transaction
    ///
    /// The transaction's own staged write wins; otherwise the store's
    /// entry is visible only if its version is at or before `read_ts`.
    /// A key written after the snapshot point reads as `KeyNotFound`.
    pub fn read(&mut self, key: &str, store: &EntryStore) -> Result<Entry> {
        self.ensure_active()?;
        match self.staged.get(key) {
            Some(Staged::Write(value)) => {
                // Staged values have no version yet; surface them at the
                // snapshot point so the caller sees a consistent view.
                return Ok(Entry::new(value.clone(), self.read_ts));
            }
            Some(Staged::Delete) => return Err(Error::KeyNotFound),
            None => {}
        }
        match store.get(key) {
            Some(entry) if entry.version <= self.read_ts => {
                self.read_versions.insert(key.to_string(), entry.version);
                Ok(entry)
            }
            Some(entry) => {
                // Newer than our snapshot: invisible, but remember we
                // looked so commit validation catches the conflict.
                self.read_versions.insert(key.to_string(), entry.version);
                Err(Error::KeyNotFound)
            }
            None => {
                self.read_versions.insert(key.to_string(), 0);
                Err(Error::KeyNotFound)
            }
        }
    }

    /// Stage a write
    ///
    /// Fails fast with [`Error::WriteConflict`] when the live version for
    /// the key already exceeds `read_ts` — the key changed since this
    /// transaction's snapshot was taken.
    pub fn stage_write(&mut self, key: &str, value: Value, store: &EntryStore) -> Result<()> {
        self.ensure_active()?;
        if !self.writable {
            return Err(Error::ReadOnlyTransaction);
        }
        if store.version_of(key).unwrap_or(0) > self.read_ts {
            return Err(Error::WriteConflict(key.to_string()));
        }
        self.staged.insert(key.to_string(), Staged::Write(value));
        Ok(())
    }

    /// Stage a delete
    ///
    /// `KeyNotFound` if the key is visible neither in the staged writes
    /// nor in the snapshot.
    pub fn stage_delete(&mut self, key: &str, store: &EntryStore) -> Result<()> {
        self.ensure_active()?;
        if !self.writable {
            return Err(Error::ReadOnlyTransaction);
        }
        let live_version = store.version_of(key).unwrap_or(0);
        if live_version > self.read_ts {
            return Err(Error::WriteConflict(key.to_string()));
        }
        let staged_visible = matches!(self.staged.get(key), Some(Staged::Write(_)));
        if !staged_visible && live_version == 0 {
            return Err(Error::KeyNotFound);
        }
        self.staged.insert(key.to_string(), Staged::Delete);
        Ok(())
    }

    /// Keys to validate at commit: everything read plus everything staged
    pub fn validation_keys(&self) -> impl Iterator<Item = &String> {
        self.read_versions
            .keys()
            .chain(self.staged.keys())
    }

    /// The staged operations in key order
    pub fn staged(&self) -> &BTreeMap<String, Staged> {
        &self.staged
    }

    /// Discard staged writes and close the transaction
    pub fn abort(&mut self) {
        self.staged.clear();
        self.read_versions.clear();
        self.finished = true;
    }

    /// Close the transaction after a commit decision
    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    fn ensure_active(&self) -> Result<()> {
        if self.finished {
            Err(Error::TransactionFinished)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(store: &EntryStore, key: &str, payload: &str) -> u64 {
        let version = store.next_version();
        store.insert(
            key.to_string(),
            Entry::new(Value::Scalar(payload.to_string()), version),
        );
        version
    }

    #[test]
    fn test_read_sees_entry_at_or_before_snapshot() {
        let store = EntryStore::new(0);
        put(&store, "k", "old");
        let mut ctx = TransactionContext::new(store.counter(), false);

        let entry = ctx.read("k", &store).unwrap();
        assert_eq!(entry.value.as_scalar(), Some("old"));
        assert_eq!(entry.version, 1);
    }

    #[test]
    fn test_overwritten_key_becomes_invisible_not_stale() {
        // The store keeps only the live entry, so a key overwritten after
        // the snapshot point reads as missing rather than as its old value.
        let store = EntryStore::new(0);
        put(&store, "k", "old");
        let mut ctx = TransactionContext::new(store.counter(), false);
        put(&store, "k", "new");

        assert!(matches!(ctx.read("k", &store), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_read_rejects_entry_newer_than_snapshot() {
        let store = EntryStore::new(0);
        let mut ctx = TransactionContext::new(store.counter(), false);
        put(&store, "k", "created later");

        assert!(matches!(ctx.read("k", &store), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_read_your_own_staged_write() {
        let store = EntryStore::new(0);
        let mut ctx = TransactionContext::new(store.counter(), true);
        ctx.stage_write("k", Value::Scalar("mine".to_string()), &store)
            .unwrap();

        let entry = ctx.read("k", &store).unwrap();
        assert_eq!(entry.value.as_scalar(), Some("mine"));
    }

    #[test]
    fn test_staged_delete_reads_as_missing() {
        let store = EntryStore::new(0);
        put(&store, "k", "v");
        let mut ctx = TransactionContext::new(store.counter(), true);
        ctx.stage_delete("k", &store).unwrap();

        assert!(matches!(ctx.read("k", &store), Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_write_on_read_only_rejected() {
        let store = EntryStore::new(0);
        let mut ctx = TransactionContext::new(store.counter(), false);
        let err = ctx
            .stage_write("k", Value::Scalar("v".to_string()), &store)
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnlyTransaction));
    }

    #[test]
    fn test_write_fails_fast_on_conflict() {
        let store = EntryStore::new(0);
        let mut ctx = TransactionContext::new(store.counter(), true);
        put(&store, "k", "concurrent");

        let err = ctx
            .stage_write("k", Value::Scalar("v".to_string()), &store)
            .unwrap_err();
        assert!(matches!(err, Error::WriteConflict(_)));
    }

    #[test]
    fn test_delete_missing_key_not_found() {
        let store = EntryStore::new(0);
        let mut ctx = TransactionContext::new(store.counter(), true);
        assert!(matches!(
            ctx.stage_delete("missing", &store),
            Err(Error::KeyNotFound)
        ));
    }

    #[test]
    fn test_abort_discards_staged_writes() {
        let store = EntryStore::new(0);
        let mut ctx = TransactionContext::new(store.counter(), true);
        ctx.stage_write("k", Value::Scalar("v".to_string()), &store)
            .unwrap();
        ctx.abort();
        assert!(ctx.is_finished());
        assert_eq!(ctx.staged_len(), 0);
        assert!(matches!(ctx.read("k", &store), Err(Error::TransactionFinished)));
    }

    #[test]
    fn test_finished_context_rejects_operations() {
        let store = EntryStore::new(0);
        let mut ctx = TransactionContext::new(store.counter(), true);
        ctx.mark_finished();
        assert!(matches!(
            ctx.stage_write("k", Value::Scalar("v".to_string()), &store),
            Err(Error::TransactionFinished)
        ));
    }
}

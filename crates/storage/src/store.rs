//! Entry store: ordered map + counter + memory accounting
//!
//! # Design
//!
//! - `RwLock<BTreeMap>`: shared readers, one exclusive writer. The map is
//!   ordered so prefix scans come out sorted without a per-call sort.
//! - `AtomicU64` counter: the engine-wide monotonic transaction counter.
//!   Reads never touch it; every write batch allocates from it.
//! - `AtomicUsize` memory: approximate tracked bytes (payload lengths),
//!   checked against the configured ceiling before any mutation.

use coffer_core::{Entry, Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// In-memory mapping from key to versioned entry
///
/// # Thread Safety
///
/// All operations are thread-safe. Reads take the shared lock; writes
/// take the exclusive lock. The transaction counter and memory gauge are
/// atomics so they can be read without locking the map.
pub struct EntryStore {
    /// Ordered key space; BTreeMap keeps prefix scans sorted
    entries: RwLock<BTreeMap<String, Entry>>,
    /// Monotonic transaction counter; last id handed out to a write
    counter: AtomicU64,
    /// Approximate tracked payload bytes
    memory: AtomicUsize,
    /// Memory ceiling in bytes; 0 = unlimited
    max_memory: u64,
}

impl EntryStore {
    /// Create an empty store with the given memory ceiling (0 = unlimited)
    pub fn new(max_memory: u64) -> Self {
        EntryStore {
            entries: RwLock::new(BTreeMap::new()),
            counter: AtomicU64::new(0),
            memory: AtomicUsize::new(0),
            max_memory,
        }
    }

    // ========================================================================
    // Counter
    // ========================================================================

    /// Current transaction counter
    #[inline]
    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Allocate the next transaction id (counter + 1)
    #[inline]
    pub fn next_version(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Set the counter (used when recovery adopts a baseline)
    pub fn set_counter(&self, value: u64) {
        self.counter.store(value, Ordering::Release);
    }

    /// Advance the counter to at least `value` (WAL replay)
    pub fn advance_counter(&self, value: u64) {
        self.counter.fetch_max(value, Ordering::AcqRel);
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get a copy of the entry for a key
    ///
    /// Read-only: never mutates version or timestamps.
    pub fn get(&self, key: &str) -> Option<Entry> {
        self.entries.read().get(key).cloned()
    }

    /// Live version for a key, if present
    pub fn version_of(&self, key: &str) -> Option<u64> {
        self.entries.read().get(key).map(|e| e.version)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All keys matching a prefix, in sorted order
    ///
    /// An empty prefix returns every key. The map is ordered, so this is
    /// a range scan rather than a collect-and-sort.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let entries = self.entries.read();
        entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Full clone of the entry mapping (snapshot serialization)
    pub fn snapshot_entries(&self) -> BTreeMap<String, Entry> {
        self.entries.read().clone()
    }

    /// Approximate tracked payload bytes
    pub fn tracked_memory(&self) -> usize {
        self.memory.load(Ordering::Acquire)
    }

    // ========================================================================
    // Budget
    // ========================================================================

    /// Check whether a write of `additional` payload bytes fits the budget
    ///
    /// `replaced` is the tracked size of the entry being overwritten (0 for
    /// a fresh key). Rejection happens before any mutation; accounting is
    /// an approximation by payload byte length.
    pub fn check_memory_budget(&self, additional: usize, replaced: usize) -> Result<()> {
        if self.max_memory == 0 {
            return Ok(());
        }
        let current = self.memory.load(Ordering::Acquire);
        let projected = current.saturating_sub(replaced) + additional;
        if projected as u64 > self.max_memory {
            return Err(Error::MemoryLimitExceeded {
                requested: projected as u64,
                limit: self.max_memory,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert or replace the entry for a key
    ///
    /// Adjusts the memory gauge for both the removed and inserted payload.
    /// Durability ordering is the caller's responsibility; the store only
    /// mutates memory.
    pub fn insert(&self, key: String, entry: Entry) {
        let added = entry.approximate_size();
        let mut entries = self.entries.write();
        let removed = entries
            .insert(key, entry)
            .map(|old| old.approximate_size())
            .unwrap_or(0);
        drop(entries);
        self.adjust_memory(added, removed);
    }

    /// Remove a key, recovering its accounted memory
    pub fn remove(&self, key: &str) -> Option<Entry> {
        let removed = self.entries.write().remove(key);
        if let Some(ref entry) = removed {
            self.adjust_memory(0, entry.approximate_size());
        }
        removed
    }

    /// Replace the whole mapping (recovery adoption)
    ///
    /// Resets the memory gauge to the sum of the adopted payloads.
    pub fn replace_all(&self, new_entries: BTreeMap<String, Entry>) {
        let total: usize = new_entries.values().map(Entry::approximate_size).sum();
        let count = new_entries.len();
        *self.entries.write() = new_entries;
        self.memory.store(total, Ordering::Release);
        debug!(entries = count, tracked_bytes = total, "store mapping replaced");
    }

    fn adjust_memory(&self, added: usize, removed: usize) {
        if added >= removed {
            self.memory.fetch_add(added - removed, Ordering::AcqRel);
        } else {
            self.memory.fetch_sub(removed - added, Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::Value;

    fn entry(payload: &str, version: u64) -> Entry {
        Entry::new(Value::Scalar(payload.to_string()), version)
    }

    #[test]
    fn test_get_missing_key() {
        let store = EntryStore::new(0);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_insert_and_get() {
        let store = EntryStore::new(0);
        store.insert("k".to_string(), entry("v", 1));
        let found = store.get("k").expect("entry should exist");
        assert_eq!(found.value.as_scalar(), Some("v"));
        assert_eq!(found.version, 1);
    }

    #[test]
    fn test_counter_allocation() {
        let store = EntryStore::new(0);
        assert_eq!(store.counter(), 0);
        assert_eq!(store.next_version(), 1);
        assert_eq!(store.next_version(), 2);
        assert_eq!(store.counter(), 2);
    }

    #[test]
    fn test_advance_counter_never_goes_backward() {
        let store = EntryStore::new(0);
        store.set_counter(10);
        store.advance_counter(5);
        assert_eq!(store.counter(), 10);
        store.advance_counter(15);
        assert_eq!(store.counter(), 15);
    }

    #[test]
    fn test_memory_tracking_on_insert_replace_remove() {
        let store = EntryStore::new(0);
        store.insert("k".to_string(), entry("abcde", 1));
        assert_eq!(store.tracked_memory(), 5);
        store.insert("k".to_string(), entry("xy", 2));
        assert_eq!(store.tracked_memory(), 2);
        store.remove("k");
        assert_eq!(store.tracked_memory(), 0);
    }

    #[test]
    fn test_memory_budget_rejects_before_mutation() {
        let store = EntryStore::new(4);
        store.insert("a".to_string(), entry("abc", 1));
        let err = store.check_memory_budget(10, 0).unwrap_err();
        assert!(matches!(err, Error::MemoryLimitExceeded { .. }));
        // Store unchanged: rejection happened before any mutation
        assert_eq!(store.len(), 1);
        assert_eq!(store.tracked_memory(), 3);
    }

    #[test]
    fn test_memory_budget_credits_replaced_entry() {
        let store = EntryStore::new(5);
        store.insert("a".to_string(), entry("abcde", 1));
        // Replacing the 5-byte payload with another 5-byte payload fits
        assert!(store.check_memory_budget(5, 5).is_ok());
        // A fresh 1-byte key does not
        assert!(store.check_memory_budget(1, 0).is_err());
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let store = EntryStore::new(0);
        assert!(store.check_memory_budget(usize::MAX / 2, 0).is_ok());
    }

    #[test]
    fn test_keys_with_prefix_sorted() {
        let store = EntryStore::new(0);
        for key in ["user:2", "user:1", "order:1", "user:10"] {
            store.insert(key.to_string(), entry("v", 1));
        }
        assert_eq!(
            store.keys_with_prefix("user:"),
            vec!["user:1", "user:10", "user:2"]
        );
        assert_eq!(store.keys_with_prefix("zzz").len(), 0);
        assert_eq!(store.keys_with_prefix("").len(), 4);
    }

    #[test]
    fn test_replace_all_resets_memory() {
        let store = EntryStore::new(0);
        store.insert("a".to_string(), entry("aaaa", 1));
        let mut adopted = BTreeMap::new();
        adopted.insert("b".to_string(), entry("bb", 2));
        store.replace_all(adopted);
        assert_eq!(store.len(), 1);
        assert_eq!(store.tracked_memory(), 2);
    }

    #[test]
    fn test_snapshot_entries_is_a_copy() {
        let store = EntryStore::new(0);
        store.insert("a".to_string(), entry("v", 1));
        let snapshot = store.snapshot_entries();
        store.remove("a");
        assert_eq!(snapshot.len(), 1);
        assert!(store.is_empty());
    }
}

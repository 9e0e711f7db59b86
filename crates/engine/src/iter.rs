//! Prefix-scoped ordered iterator
//!
//! The cursor holds a key, not a map position: every `seek` and `next`
//! re-derives the sorted key set from the live store, so the iterator
//! stays coherent under concurrent writes at the cost of re-scanning.
//! `item` returns a defensive copy of the entry, or `None` if the
//! cursor's key was deleted out from under it.

use crate::database::Inner;
use coffer_core::Entry;
use std::sync::Arc;

/// Ordered cursor over the keys matching a prefix
pub struct Iter {
    inner: Arc<Inner>,
    prefix: String,
    reverse: bool,
    cursor: Option<String>,
}

impl Iter {
    pub(crate) fn new(inner: Arc<Inner>, prefix: String, reverse: bool) -> Self {
        let mut iter = Iter {
            inner,
            prefix,
            reverse,
            cursor: None,
        };
        iter.rewind();
        iter
    }

    /// The prefix this cursor is scoped to
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether the cursor currently holds a key
    pub fn valid(&self) -> bool {
        self.cursor.is_some()
    }

    /// The key under the cursor
    pub fn key(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// A copy of the entry under the cursor
    ///
    /// `None` if the cursor is invalid or the key was deleted since the
    /// cursor last moved.
    pub fn item(&self) -> Option<Entry> {
        self.cursor.as_deref().and_then(|key| self.inner.store.get(key))
    }

    /// Position at the first key in iteration order
    pub fn rewind(&mut self) {
        self.cursor = self.ordered_keys().into_iter().next();
    }

    /// Position at the first key at or past `key` in iteration order
    ///
    /// Forward cursors land on the first key `>= key`, reverse cursors
    /// on the first key `<= key`. If no key qualifies, the cursor falls
    /// back to the first key in prefix order; an empty key set leaves it
    /// invalid.
    pub fn seek(&mut self, key: &str) {
        let keys = self.ordered_keys();
        let found = if self.reverse {
            keys.iter().find(|k| k.as_str() <= key)
        } else {
            keys.iter().find(|k| k.as_str() >= key)
        };
        self.cursor = found.or_else(|| keys.first()).cloned();
    }

    /// Advance to the key immediately following the cursor
    ///
    /// Invalidates the cursor when the current key was last. A `next` on
    /// an invalid cursor stays invalid.
    pub fn next(&mut self) {
        let Some(current) = self.cursor.take() else {
            return;
        };
        let keys = self.ordered_keys();
        self.cursor = if self.reverse {
            keys.into_iter().find(|k| k.as_str() < current.as_str())
        } else {
            keys.into_iter().find(|k| k.as_str() > current.as_str())
        };
    }

    fn ordered_keys(&self) -> Vec<String> {
        let mut keys = self.inner.store.keys_with_prefix(&self.prefix);
        if self.reverse {
            keys.reverse();
        }
        keys
    }
}

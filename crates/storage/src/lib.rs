//! In-memory entry store for Coffer
//!
//! The [`EntryStore`] is the single source of truth during normal
//! operation: an ordered map from key to versioned entry, guarded by one
//! readers-writer lock, with an atomic transaction counter and an
//! approximate memory accountant.

mod store;

pub use store::EntryStore;

//! Main database entry point
//!
//! `Coffer` is a cloneable handle over the engine database. All clones
//! share one store and one set of durability files; the last handle to
//! go away performs the final save.

use coffer_engine::{Config, Database, Entry, Iter, Result, Transaction, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// The Coffer database
///
/// Create one with [`Coffer::open`] for the defaults or
/// [`Coffer::builder`] to tune configuration.
///
/// # Example
///
/// ```ignore
/// use cofferdb::prelude::*;
///
/// let db = Coffer::builder()
///     .path("./my-db")
///     .sync_write(true)
///     .keep_versions(true)
///     .open()?;
/// db.put("k", Value::Scalar("v".into()))?;
/// db.close()?;
/// ```
#[derive(Clone)]
pub struct Coffer {
    inner: Arc<Database>,
}

impl Coffer {
    /// Open a database directory with the default configuration
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Start configuring a database
    pub fn builder() -> CofferBuilder {
        CofferBuilder::default()
    }

    /// Get a copy of the entry for a key
    pub fn get(&self, key: &str) -> Result<Entry> {
        self.inner.get(key)
    }

    /// Insert or replace the entry for a key, returning its new version
    pub fn put(&self, key: &str, value: Value) -> Result<u64> {
        self.inner.put(key, value)
    }

    /// Remove the entry for a key
    pub fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the database holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Current transaction counter
    pub fn counter(&self) -> u64 {
        self.inner.counter()
    }

    /// Begin a snapshot-isolated transaction
    pub fn begin(&self, writable: bool) -> Transaction {
        self.inner.begin(writable)
    }

    /// Create an ordered cursor over keys matching a prefix
    pub fn iter(&self, prefix: &str, reverse: bool) -> Iter {
        self.inner.iter(prefix, reverse)
    }

    /// Persist a snapshot of the current state immediately
    pub fn save(&self) -> Result<()> {
        self.inner.save()
    }

    /// Close this handle, saving a final snapshot
    ///
    /// If other clones of the handle are still alive the engine stays
    /// open for them; the final save then happens when the last clone
    /// is dropped or closed.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.inner) {
            Ok(db) => db.close(),
            Err(_still_shared) => Ok(()),
        }
    }
}

/// Builder for [`Coffer`], delegating to the engine configuration
#[derive(Debug, Default)]
pub struct CofferBuilder {
    config: coffer_engine::ConfigBuilder,
}

impl CofferBuilder {
    /// Directory holding the database files
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.config = self.config.data_dir(path.as_ref());
        self
    }

    /// Force an fsync on snapshot and log writes
    pub fn sync_write(mut self, enabled: bool) -> Self {
        self.config = self.config.sync_write(enabled);
        self
    }

    /// Cadence of the background snapshot task; `None` disables it
    pub fn autosave_interval(mut self, interval: Option<Duration>) -> Self {
        self.config = self.config.autosave_interval(interval);
        self
    }

    /// Tracked-memory budget in bytes; 0 = unlimited
    pub fn max_memory(mut self, bytes: u64) -> Self {
        self.config = self.config.max_memory(bytes);
        self
    }

    /// Maintain a redundant append-only command log
    pub fn append_only(mut self, enabled: bool) -> Self {
        self.config = self.config.append_only(enabled);
        self
    }

    /// Rotate the append-only log past this size; 0 never rotates
    pub fn append_target_size(mut self, bytes: u64) -> Self {
        self.config = self.config.append_target_size(bytes);
        self
    }

    /// Record superseded values in per-entry history
    pub fn keep_versions(mut self, enabled: bool) -> Self {
        self.config = self.config.keep_versions(enabled);
        self
    }

    /// Bound on per-entry history length; 0 = unlimited
    pub fn max_versions(mut self, count: usize) -> Self {
        self.config = self.config.max_versions(count);
        self
    }

    /// Open the database
    pub fn open(self) -> Result<Coffer> {
        Coffer::with_config(self.config.build())
    }
}

impl Coffer {
    /// Open a database from an explicit [`Config`]
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Coffer {
            inner: Arc::new(Database::open(config)?),
        })
    }
}

//! Database facade over the store, durability layer, and transactions
//!
//! One `Database` owns one data directory. Opening runs recovery and
//! adopts the reconstructed state; every write goes through the WAL
//! before a synchronous snapshot makes it the new baseline and clears
//! the log. Lock order is always `writer` then `durable`; the
//! transaction manager's commit lock nests inside both.

use crate::autosave::AutosaveWorker;
use crate::config::Config;
use crate::iter::Iter;
use crate::transaction::Transaction;
use coffer_concurrency::TransactionManager;
use coffer_core::{Entry, Error, Result, Value};
use coffer_durability::{recover, wal, AppendLog, Command, DataFile, Snapshot, WalEntry, WalWriter};
use coffer_storage::EntryStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The durability sinks, guarded together so a batch reaches the WAL and
/// the append log without another write interleaving
pub(crate) struct Durable {
    pub(crate) wal: WalWriter,
    pub(crate) aof: Option<AppendLog>,
}

/// State shared between the database handle, transactions, iterators,
/// and the autosave task
pub(crate) struct Inner {
    pub(crate) config: Config,
    pub(crate) store: EntryStore,
    pub(crate) manager: TransactionManager,
    pub(crate) durable: Mutex<Durable>,
    /// Serializes writes and snapshot I/O against each other
    pub(crate) writer: Mutex<()>,
}

impl Inner {
    /// Write a snapshot of the current state and clear the WAL
    ///
    /// Caller must hold `writer`. The snapshot reflects every batch the
    /// WAL holds, so resetting the log afterwards loses nothing. The
    /// append log is rotated here too once it outgrows its target.
    pub(crate) fn save_locked(&self) -> Result<()> {
        let data = DataFile::new(self.store.counter(), self.store.snapshot_entries());
        Snapshot::write(&self.config.data_dir, &data, self.config.sync_write)?;
        let mut durable = self.durable.lock();
        durable.wal.reset()?;
        if let Some(aof) = durable.aof.as_mut() {
            if aof.should_rotate(self.config.append_target_size) {
                aof.rotate(&data)?;
            }
        }
        Ok(())
    }
}

/// An embedded, single-process key-value database
///
/// All methods take `&self`; the handle can be shared behind an `Arc`
/// or used from multiple threads directly. Dropping the handle performs
/// a final save; [`Database::close`] does the same but surfaces errors.
pub struct Database {
    inner: Arc<Inner>,
    autosave: Option<AutosaveWorker>,
    closed: bool,
}

impl Database {
    /// Open a database, running recovery against the data directory
    ///
    /// Replayed WAL batches are folded into a fresh snapshot right away
    /// so the log starts empty.
    pub fn open(config: Config) -> Result<Self> {
        let state = recover(&config.data_dir)?;
        let replayed = state.wal_batches_replayed;

        let store = EntryStore::new(config.max_memory);
        store.replace_all(state.entries);
        store.set_counter(state.counter);

        let wal = WalWriter::open(config.data_dir.join(wal::WAL_FILENAME))?;
        let aof = if config.append_only {
            Some(AppendLog::open(&config.data_dir)?)
        } else {
            None
        };

        let inner = Arc::new(Inner {
            store,
            manager: TransactionManager::new(),
            durable: Mutex::new(Durable { wal, aof }),
            writer: Mutex::new(()),
            config,
        });

        if replayed > 0 {
            let _write_guard = inner.writer.lock();
            inner.save_locked()?;
            debug!(batches = replayed, "replayed wal folded into snapshot");
        }

        let autosave = inner
            .config
            .autosave_interval
            .map(|interval| AutosaveWorker::spawn(Arc::clone(&inner), interval));

        info!(
            dir = %inner.config.data_dir.display(),
            entries = inner.store.len(),
            counter = inner.store.counter(),
            "database open"
        );
        Ok(Database {
            inner,
            autosave,
            closed: false,
        })
    }

    /// The configuration this database was opened with
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get a copy of the entry for a key
    pub fn get(&self, key: &str) -> Result<Entry> {
        self.inner.store.get(key).ok_or(Error::KeyNotFound)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.inner.store.contains(key)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Check if the database holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Current transaction counter
    pub fn counter(&self) -> u64 {
        self.inner.store.counter()
    }

    /// Approximate tracked payload bytes
    pub fn tracked_memory(&self) -> usize {
        self.inner.store.tracked_memory()
    }

    /// Insert or replace the entry for a key
    ///
    /// Assigns the next transaction counter value as the entry version,
    /// appends a one-command WAL batch, applies the write, and persists
    /// a snapshot before returning. Returns the assigned version.
    ///
    /// With versioning enabled the superseded state is pushed onto the
    /// entry's history, bounded by `max_versions`.
    pub fn put(&self, key: &str, value: Value) -> Result<u64> {
        let inner = &self.inner;
        let _write_guard = inner.writer.lock();

        let existing = inner.store.get(key);
        let replaced = existing.as_ref().map(Entry::approximate_size).unwrap_or(0);
        // The version is assigned only after the budget check passes, so
        // a rejected put does not advance the counter.
        let mut entry = match existing {
            Some(previous) => previous.superseded_by(
                value,
                0,
                inner.config.keep_versions,
                inner.config.max_versions,
            ),
            None => Entry::new(value, 0),
        };
        inner
            .store
            .check_memory_budget(entry.approximate_size(), replaced)?;
        let version = inner.store.next_version();
        entry.version = version;

        let batch = WalEntry::new(version, vec![Command::put(key, &entry)]);
        {
            let mut durable = inner.durable.lock();
            durable.wal.append(&batch)?;
            inner.store.insert(key.to_string(), entry);
            if let Some(aof) = durable.aof.as_mut() {
                aof.append(&batch)?;
            }
        }
        inner.save_locked()?;
        Ok(version)
    }

    /// Remove the entry for a key
    ///
    /// `KeyNotFound` if the key does not exist. The removal is logged
    /// and snapshotted like a put.
    pub fn delete(&self, key: &str) -> Result<()> {
        let inner = &self.inner;
        let _write_guard = inner.writer.lock();

        let existing = inner.store.get(key).ok_or(Error::KeyNotFound)?;
        let version = inner.store.next_version();
        let batch = WalEntry::new(
            version,
            vec![Command::delete(key, version, existing.kind())],
        );
        {
            let mut durable = inner.durable.lock();
            durable.wal.append(&batch)?;
            inner.store.remove(key);
            if let Some(aof) = durable.aof.as_mut() {
                aof.append(&batch)?;
            }
        }
        inner.save_locked()?;
        Ok(())
    }

    /// Begin a transaction with a snapshot of the current state
    pub fn begin(&self, writable: bool) -> Transaction {
        let ctx = self.inner.manager.begin(&self.inner.store, writable);
        Transaction::new(Arc::clone(&self.inner), ctx)
    }

    /// Create an ordered cursor over keys matching a prefix
    ///
    /// The cursor starts at the first key in iteration order. An empty
    /// prefix covers the whole key space; `reverse` flips the order.
    pub fn iter(&self, prefix: &str, reverse: bool) -> Iter {
        Iter::new(Arc::clone(&self.inner), prefix.to_string(), reverse)
    }

    /// Persist a snapshot of the current state immediately
    pub fn save(&self) -> Result<()> {
        let _write_guard = self.inner.writer.lock();
        self.inner.save_locked()
    }

    /// Stop the autosave task, write a final snapshot, and close
    pub fn close(mut self) -> Result<()> {
        let result = self.shutdown();
        self.closed = true;
        result
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(mut worker) = self.autosave.take() {
            worker.stop();
        }
        let _write_guard = self.inner.writer.lock();
        self.inner.save_locked()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.shutdown() {
            warn!(error = %err, "final save on drop failed");
        }
    }
}

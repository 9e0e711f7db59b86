//! Transaction handle
//!
//! Thin wrapper binding a [`TransactionContext`] to the database it was
//! begun on. Reads serve the snapshot taken at begin; writes stage
//! locally until `commit` validates and applies them as one durable
//! batch. Dropping the handle without committing discards the staged
//! writes.

use crate::database::Inner;
use coffer_concurrency::TransactionContext;
use coffer_core::{Entry, Result, Value};
use std::sync::Arc;

/// A snapshot-isolated transaction over one database
pub struct Transaction {
    inner: Arc<Inner>,
    ctx: TransactionContext,
}

impl Transaction {
    pub(crate) fn new(inner: Arc<Inner>, ctx: TransactionContext) -> Self {
        Transaction { inner, ctx }
    }

    /// The snapshot point captured at begin
    pub fn read_ts(&self) -> u64 {
        self.ctx.read_ts()
    }

    /// Whether this transaction may stage writes
    pub fn is_writable(&self) -> bool {
        self.ctx.is_writable()
    }

    /// Read a key as of the transaction's snapshot
    ///
    /// The transaction's own staged write wins; a key changed after the
    /// snapshot point reads as `KeyNotFound`.
    pub fn read(&mut self, key: &str) -> Result<Entry> {
        self.ctx.read(key, &self.inner.store)
    }

    /// Stage a write, failing fast on a conflicting concurrent change
    pub fn write(&mut self, key: &str, value: Value) -> Result<()> {
        self.ctx.stage_write(key, value, &self.inner.store)
    }

    /// Stage a delete
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.ctx.stage_delete(key, &self.inner.store)
    }

    /// Validate and apply the staged writes as one atomic batch
    ///
    /// A read-only or empty transaction commits as a no-op. On success
    /// the batch is in the WAL and a fresh snapshot; on `WriteConflict`
    /// nothing is applied and the caller may retry with a new
    /// transaction.
    pub fn commit(mut self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let _write_guard = inner.writer.lock();
        let batch = {
            let mut durable = inner.durable.lock();
            let batch = inner.manager.commit(
                &mut self.ctx,
                &inner.store,
                &mut durable.wal,
                inner.config.versioning_policy(),
            )?;
            if let Some(batch) = &batch {
                if let Some(aof) = durable.aof.as_mut() {
                    aof.append(batch)?;
                }
            }
            batch
        };
        if batch.is_some() {
            inner.save_locked()?;
        }
        Ok(())
    }

    /// Discard the staged writes and close the transaction
    pub fn abort(mut self) {
        self.inner.manager.abort(&mut self.ctx);
    }
}

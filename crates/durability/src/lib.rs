//! Durability layer for Coffer
//!
//! Translates in-memory state changes into crash-safe on-disk artifacts:
//!
//! - [`wal`]: write-ahead log of command batches since the last snapshot
//! - [`snapshot`]: full-state snapshot with atomic file replacement
//! - [`aof`]: optional append-only log with whole-file rotation
//! - [`recovery`]: startup protocol replaying the WAL over the snapshot
//!
//! The snapshot is the authoritative recovery source; the WAL exists to
//! capture writes between snapshots. A successful snapshot write
//! logically truncates the WAL.
//!
//! ## On-disk layout (under the data directory)
//!
//! ```text
//! data.db          current snapshot (bincode DataFile)
//! data.db.tmp      snapshot write staging
//! data.db.bak      transient backup during atomic replace
//! wal.db           pending WAL batches; absent after a clean snapshot
//! appendonly.aof   optional periodically rewritten full-state log
//! ```

pub mod aof;
pub mod frame;
pub mod recovery;
pub mod snapshot;
pub mod wal;

pub use aof::AppendLog;
pub use recovery::{recover, RecoveredState};
pub use snapshot::{DataFile, Snapshot, FORMAT_VERSION};
pub use wal::{Command, CommandOp, WalEntry, WalWriter};

//! Coffer database engine
//!
//! Binds the entry store, durability layer, and transaction manager
//! into one embeddable database:
//!
//! - [`Database`]: open, `get`/`put`/`delete`, explicit `save`, `close`
//! - [`Transaction`]: snapshot-isolated read/write/delete with an
//!   atomic, durable commit
//! - [`Iter`]: prefix-scoped ordered cursor over the key space
//! - [`Config`]: data directory, sync and autosave policy, memory
//!   budget, append-only log, version history
//!
//! Every acknowledged write has reached the write-ahead log or the
//! snapshot file before the call returns. Startup replays the log over
//! the last snapshot, so a crash between the two loses nothing.

mod autosave;
pub mod config;
pub mod database;
pub mod iter;
pub mod transaction;

pub use config::{Config, ConfigBuilder};
pub use database::Database;
pub use iter::Iter;
pub use transaction::Transaction;

pub use coffer_core::{Entry, EntryVersion, Error, Kind, Result, Value};

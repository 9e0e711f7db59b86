//! # Coffer
//!
//! Embedded, single-process key-value storage engine with typed values,
//! write-ahead logging, snapshot durability, and optimistic
//! transactions.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cofferdb::prelude::*;
//!
//! // Open a database directory
//! let db = Coffer::open("./my-db")?;
//!
//! // Typed values
//! db.put("user:1", Value::Scalar("alice".into()))?;
//! let entry = db.get("user:1")?;
//!
//! // Snapshot-isolated transactions
//! let mut txn = db.begin(true);
//! txn.write("counter", Value::Scalar("1".into()))?;
//! txn.commit()?;
//!
//! // Ordered prefix scans
//! let mut iter = db.iter("user:", false);
//! while iter.valid() {
//!     println!("{}", iter.key().unwrap());
//!     iter.next();
//! }
//!
//! // Graceful shutdown
//! db.close()?;
//! ```
//!
//! ## Durability
//!
//! Every acknowledged write reaches the write-ahead log or the snapshot
//! file before the call returns. On startup the log is replayed over
//! the last snapshot, so a crash between the two loses nothing. An
//! optional append-only log provides a second durable stream with
//! whole-file rotation.
//!
//! ## Concurrency
//!
//! Transactions are optimistic with snapshot isolation: reads observe
//! the state as of `begin`, writes stage locally, and commit validates
//! the read and write sets under a global commit lock. First committer
//! wins; the loser gets [`Error::WriteConflict`] and may retry.

#![warn(missing_docs)]

mod database;

pub mod prelude;

pub use database::{Coffer, CofferBuilder};

pub use coffer_engine::{
    Config, ConfigBuilder, Entry, EntryVersion, Error, Iter, Kind, Result, Transaction, Value,
};

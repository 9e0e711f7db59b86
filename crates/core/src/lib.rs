//! Core types for the Coffer storage engine
//!
//! This crate defines the types shared by every layer of the engine:
//! - [`Value`]: the tagged union of storable payloads
//! - [`Entry`]: the versioned, timestamped unit of storage
//! - [`Error`]: the unified error taxonomy

pub mod entry;
pub mod error;
pub mod value;

pub use entry::{now_millis, Entry, EntryVersion, Timestamp};
pub use error::{Error, Result};
pub use value::{Kind, Value};

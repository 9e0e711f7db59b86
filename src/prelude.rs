//! Convenience re-exports for the common case
//!
//! ```ignore
//! use cofferdb::prelude::*;
//! ```

pub use crate::{Coffer, CofferBuilder, Entry, Error, Kind, Result, Value};

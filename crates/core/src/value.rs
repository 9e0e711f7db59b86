//! Value types for Coffer
//!
//! This module defines the canonical [`Value`] type: the tagged union of
//! everything the engine can store under a key. The five variants map
//! one-to-one onto the typed operation surfaces layered above the core.
//!
//! ## Equality Rules
//!
//! - Different variants are never equal (no coercion between types)
//! - `SortedSet` compares member order and scores; scores use IEEE-754
//!   equality, so a stored `NaN` score never compares equal

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Canonical Coffer value type
///
/// Every entry in the store holds exactly one `Value`. The variant tag is
/// the entry's type; typed operations must check [`Value::kind`] before
/// interpreting the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A single string payload
    Scalar(String),

    /// Ordered sequence of strings
    List(Vec<String>),

    /// String-to-string mapping
    Map(HashMap<String, String>),

    /// Unordered set of unique strings
    Set(HashSet<String>),

    /// Ordered sequence of (member, score) pairs
    SortedSet(Vec<(String, f64)>),
}

/// Type tag for a [`Value`], used in WAL commands and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Single string
    Scalar,
    /// Ordered sequence of strings
    List,
    /// String-to-string mapping
    Map,
    /// Set of unique strings
    Set,
    /// Ordered (member, score) pairs
    SortedSet,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Kind::Scalar => "scalar",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Set => "set",
            Kind::SortedSet => "sorted-set",
        })
    }
}

impl Value {
    /// The type tag of this value
    pub fn kind(&self) -> Kind {
        match self {
            Value::Scalar(_) => Kind::Scalar,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Set(_) => Kind::Set,
            Value::SortedSet(_) => Kind::SortedSet,
        }
    }

    /// Type name as a string (for error messages and logs)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "sorted-set",
        }
    }

    /// Approximate payload size in bytes
    ///
    /// Used for memory accounting. This counts string byte lengths plus
    /// fixed-width score storage; it is an approximation of retained
    /// memory, not an exact process measurement.
    pub fn approximate_size(&self) -> usize {
        match self {
            Value::Scalar(s) => s.len(),
            Value::List(items) => items.iter().map(String::len).sum(),
            Value::Map(fields) => fields.iter().map(|(k, v)| k.len() + v.len()).sum(),
            Value::Set(members) => members.iter().map(String::len).sum(),
            Value::SortedSet(pairs) => pairs
                .iter()
                .map(|(member, _)| member.len() + std::mem::size_of::<f64>())
                .sum(),
        }
    }

    /// Try to get as a scalar string
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a list slice
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as a map reference
    pub fn as_map(&self) -> Option<&HashMap<String, String>> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Try to get as a set reference
    pub fn as_set(&self) -> Option<&HashSet<String>> {
        match self {
            Value::Set(members) => Some(members),
            _ => None,
        }
    }

    /// Try to get as sorted-set pairs
    pub fn as_sorted_set(&self) -> Option<&[(String, f64)]> {
        match self {
            Value::SortedSet(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Check the variant against an expected kind
    ///
    /// This is the runtime tag check at the store boundary; typed
    /// operation wrappers call it before interpreting the payload.
    pub fn expect_kind(&self, expected: Kind) -> crate::error::Result<&Value> {
        if self.kind() == expected {
            Ok(self)
        } else {
            Err(crate::error::Error::TypeMismatch {
                expected,
                actual: self.kind(),
            })
        }
    }
}

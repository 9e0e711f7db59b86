//! Versioned entries
//!
//! An [`Entry`] is the atomic unit of storage: one typed value, the
//! transaction id that last wrote it, timestamps, and a bounded history
//! of prior versions when versioning is enabled.
//!
//! The live `version` is always greater than or equal to every version
//! in the entry's own history.

use crate::value::{Kind, Value};
use serde::{Deserialize, Serialize};

/// Millisecond UNIX timestamp, as produced by `chrono::Utc::now()`
pub type Timestamp = i64;

/// Current time in milliseconds since the UNIX epoch
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// One prior state of an entry, retained in its version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryVersion {
    /// Value at the time it was superseded
    pub value: Value,
    /// Transaction id that wrote this state
    pub version: u64,
    /// Creation timestamp carried from the live entry
    pub created: Timestamp,
    /// Last-update timestamp at the time it was superseded
    pub last_updated: Timestamp,
}

/// The atomic unit of storage: a typed value plus version metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Typed payload
    pub value: Value,
    /// Transaction id that last wrote this entry
    pub version: u64,
    /// When the key was first written
    pub created: Timestamp,
    /// When the entry was last replaced
    pub last_updated: Timestamp,
    /// Prior states, oldest first; empty unless versioning is enabled
    #[serde(default)]
    pub versions: Vec<EntryVersion>,
}

impl Entry {
    /// Create a fresh entry for a first write
    pub fn new(value: Value, version: u64) -> Self {
        let now = now_millis();
        Entry {
            value,
            version,
            created: now,
            last_updated: now,
            versions: Vec::new(),
        }
    }

    /// Type tag of the stored value
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Approximate bytes this entry accounts for in the memory budget
    ///
    /// Counts the live payload plus every retained history payload.
    pub fn approximate_size(&self) -> usize {
        self.value.approximate_size()
            + self
                .versions
                .iter()
                .map(|v| v.value.approximate_size())
                .sum::<usize>()
    }

    /// Build the replacement entry for a read-modify-write
    ///
    /// Carries `created` forward, stamps `last_updated`, and (when
    /// `keep_versions` is set) pushes the current state onto the history,
    /// evicting the oldest once `max_versions` is exceeded
    /// (`max_versions == 0` means unlimited).
    pub fn superseded_by(
        &self,
        value: Value,
        version: u64,
        keep_versions: bool,
        max_versions: usize,
    ) -> Self {
        let mut versions = if keep_versions {
            let mut history = self.versions.clone();
            history.push(EntryVersion {
                value: self.value.clone(),
                version: self.version,
                created: self.created,
                last_updated: self.last_updated,
            });
            history
        } else {
            Vec::new()
        };
        if max_versions > 0 {
            while versions.len() > max_versions {
                versions.remove(0);
            }
        }
        Entry {
            value,
            version,
            created: self.created,
            last_updated: now_millis(),
            versions,
        }
    }

    /// Check that the live version dominates the history
    pub fn version_is_monotonic(&self) -> bool {
        self.versions.iter().all(|v| v.version <= self.version)
    }
}

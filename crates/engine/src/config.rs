//! Engine configuration
//!
//! All knobs the database recognizes, with a builder for callers that
//! only want to change one or two of them. The defaults favor a
//! development setup: no fsync on every write, a one-minute autosave,
//! no memory cap, no append-only log, no version history.

use coffer_concurrency::VersioningPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Default snapshot cadence for the background autosave task
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(60);

/// Default rotation threshold for the append-only log, in bytes
pub const DEFAULT_APPEND_TARGET_SIZE: u64 = 64 * 1024 * 1024;

/// Database configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the snapshot, WAL, and append-only log files
    pub data_dir: PathBuf,
    /// Force an fsync on snapshot and log writes
    pub sync_write: bool,
    /// Cadence of the background snapshot task; `None` disables it
    pub autosave_interval: Option<Duration>,
    /// Tracked-memory budget in bytes; 0 = unlimited
    pub max_memory: u64,
    /// Maintain a redundant append-only command log
    pub append_only: bool,
    /// Rotate the append-only log once it grows past this size; 0 never rotates
    pub append_target_size: u64,
    /// Record superseded values in per-entry history
    pub keep_versions: bool,
    /// Bound on per-entry history length; 0 = unlimited
    pub max_versions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("coffer-data"),
            sync_write: false,
            autosave_interval: Some(DEFAULT_AUTOSAVE_INTERVAL),
            max_memory: 0,
            append_only: false,
            append_target_size: DEFAULT_APPEND_TARGET_SIZE,
            keep_versions: false,
            max_versions: 0,
        }
    }
}

impl Config {
    /// Start a builder from the defaults
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The version-history policy committed writes follow
    pub fn versioning_policy(&self) -> VersioningPolicy {
        VersioningPolicy {
            keep_versions: self.keep_versions,
            max_versions: self.max_versions,
        }
    }
}

/// Fluent builder over [`Config`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn sync_write(mut self, enabled: bool) -> Self {
        self.config.sync_write = enabled;
        self
    }

    pub fn autosave_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.autosave_interval = interval;
        self
    }

    pub fn max_memory(mut self, bytes: u64) -> Self {
        self.config.max_memory = bytes;
        self
    }

    pub fn append_only(mut self, enabled: bool) -> Self {
        self.config.append_only = enabled;
        self
    }

    pub fn append_target_size(mut self, bytes: u64) -> Self {
        self.config.append_target_size = bytes;
        self
    }

    pub fn keep_versions(mut self, enabled: bool) -> Self {
        self.config.keep_versions = enabled;
        self
    }

    pub fn max_versions(mut self, count: usize) -> Self {
        self.config.max_versions = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.sync_write);
        assert_eq!(config.autosave_interval, Some(DEFAULT_AUTOSAVE_INTERVAL));
        assert_eq!(config.max_memory, 0);
        assert!(!config.append_only);
        assert!(!config.keep_versions);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::builder()
            .data_dir("/tmp/x")
            .sync_write(true)
            .autosave_interval(None)
            .max_memory(1024)
            .append_only(true)
            .append_target_size(4096)
            .keep_versions(true)
            .max_versions(3)
            .build();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/x"));
        assert!(config.sync_write);
        assert!(config.autosave_interval.is_none());
        assert_eq!(config.max_memory, 1024);
        assert!(config.append_only);
        assert_eq!(config.append_target_size, 4096);
        let policy = config.versioning_policy();
        assert!(policy.keep_versions);
        assert_eq!(policy.max_versions, 3);
    }
}

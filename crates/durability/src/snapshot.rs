//! Full-state snapshot
//!
//! The snapshot is a single bincode-serialized [`DataFile`]: format
//! version, transaction counter, and the full entry mapping. It is the
//! authoritative recovery baseline.
//!
//! Writes are atomic at the file level: serialize into `data.db.tmp`,
//! rename the live file to `data.db.bak`, rename the staging file into
//! place, then delete the backup. A failed final rename restores the
//! backup, so there is never a moment with zero valid snapshot files on
//! disk.

use coffer_core::{Entry, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Live snapshot file name under the data directory
pub const DATA_FILENAME: &str = "data.db";
/// Staging file used while writing a new snapshot
pub const DATA_TMP_FILENAME: &str = "data.db.tmp";
/// Transient backup of the previous snapshot during replacement
pub const DATA_BAK_FILENAME: &str = "data.db.bak";

/// On-disk snapshot format version
pub const FORMAT_VERSION: u32 = 1;

/// The on-disk snapshot payload
///
/// A `DataFile` read immediately after a clean write reconstructs an
/// entry store identical to the in-memory one at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    /// Format version tag; readers reject versions they do not know
    pub format_version: u32,
    /// Transaction counter at save time
    pub counter: u64,
    /// Full entry mapping
    pub entries: BTreeMap<String, Entry>,
}

impl DataFile {
    /// Build a snapshot payload from a counter and entry mapping
    pub fn new(counter: u64, entries: BTreeMap<String, Entry>) -> Self {
        DataFile {
            format_version: FORMAT_VERSION,
            counter,
            entries,
        }
    }

    /// Encode to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bytes, validating the format version
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let data: DataFile = bincode::deserialize(bytes)?;
        if data.format_version != FORMAT_VERSION {
            return Err(Error::Corruption(format!(
                "unsupported snapshot format version {}",
                data.format_version
            )));
        }
        Ok(data)
    }
}

/// Snapshot file operations under a data directory
pub struct Snapshot;

impl Snapshot {
    /// Path of the live snapshot file
    pub fn live_path(dir: &Path) -> PathBuf {
        dir.join(DATA_FILENAME)
    }

    /// Create an empty live snapshot file if none exists
    pub fn ensure_exists(dir: &Path) -> Result<()> {
        let live = Self::live_path(dir);
        if !live.exists() {
            File::create(&live)?;
        }
        Ok(())
    }

    /// Write a snapshot with atomic replacement
    ///
    /// When `sync` is set the staging file is fsynced before the rename,
    /// trading latency for a zero data-loss window on the snapshot itself.
    pub fn write(dir: &Path, data: &DataFile, sync: bool) -> Result<()> {
        let live = dir.join(DATA_FILENAME);
        let tmp = dir.join(DATA_TMP_FILENAME);
        let bak = dir.join(DATA_BAK_FILENAME);

        let payload = data.encode()?;
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&payload)?;
            writer.flush()?;
            if sync {
                writer.get_ref().sync_data()?;
            }
        }

        // Keep the old snapshot reachable until the new one is in place
        let had_previous = live.exists();
        if had_previous {
            fs::rename(&live, &bak)?;
        }
        Self::promote(dir, &tmp, &live, &bak, had_previous)?;

        debug!(
            dir = %dir.display(),
            counter = data.counter,
            entries = data.entries.len(),
            "snapshot written"
        );
        Ok(())
    }

    /// Rename the staging file into the live path
    ///
    /// On failure the backup is restored into the live path, so the
    /// directory never ends up with zero valid snapshot files. On
    /// success the backup is deleted.
    fn promote(
        dir: &Path,
        tmp: &Path,
        live: &Path,
        bak: &Path,
        had_previous: bool,
    ) -> Result<()> {
        if let Err(rename_err) = fs::rename(tmp, live) {
            if had_previous {
                if let Err(restore_err) = fs::rename(bak, live) {
                    error!(
                        dir = %dir.display(),
                        %rename_err,
                        %restore_err,
                        "snapshot replace failed and backup restore failed"
                    );
                    return Err(Error::Io(rename_err));
                }
                warn!(dir = %dir.display(), %rename_err, "snapshot replace failed, backup restored");
            }
            return Err(Error::Io(rename_err));
        }

        if had_previous {
            if let Err(e) = fs::remove_file(bak) {
                // The new snapshot is live; a lingering backup is harmless
                warn!(dir = %dir.display(), error = %e, "failed to remove snapshot backup");
            }
        }
        Ok(())
    }

    /// Load the live snapshot
    ///
    /// An absent or empty file means a fresh store and yields `None`.
    pub fn load(dir: &Path) -> Result<Option<DataFile>> {
        let live = dir.join(DATA_FILENAME);
        if !live.exists() {
            return Ok(None);
        }
        let mut bytes = Vec::new();
        File::open(&live)?.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(DataFile::decode(&bytes)?))
    }
}

//! Append-only log
//!
//! Optional secondary persistence: every committed batch is appended to
//! `appendonly.aof` using the same framing as the WAL. The file has no
//! incremental compaction; once it passes the configured target size it
//! is rotated — the full current state is written as one batch into a
//! staging file which atomically replaces the old log.

use crate::frame;
use crate::snapshot::DataFile;
use crate::wal::{Command, WalEntry};
use coffer_core::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Append-only log file name under the data directory
pub const AOF_FILENAME: &str = "appendonly.aof";
/// Staging file used during rotation
pub const AOF_TMP_FILENAME: &str = "appendonly.aof.tmp";

/// Periodically rewritten full-state append log
pub struct AppendLog {
    file: File,
    path: PathBuf,
    size: u64,
}

impl AppendLog {
    /// Open (or create) the append log in a data directory
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(AOF_FILENAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        Ok(AppendLog { file, path, size })
    }

    /// Current file length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one batch and force it to stable storage
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        let payload = entry.encode()?;
        frame::write_record(&mut self.file, &payload)?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.size += frame::HEADER_SIZE + payload.len() as u64;
        Ok(())
    }

    /// Check whether the file has outgrown the rotation target
    ///
    /// A target of 0 disables rotation.
    pub fn should_rotate(&self, target_size: u64) -> bool {
        target_size > 0 && self.size >= target_size
    }

    /// Rewrite the log as the full current state and atomically replace it
    ///
    /// Functionally a periodic compaction of the append log, not an
    /// incremental one: the new file holds a single batch with one put
    /// command per live entry.
    pub fn rotate(&mut self, data: &DataFile) -> Result<()> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let tmp = dir.join(AOF_TMP_FILENAME);

        let commands: Vec<Command> = data
            .entries
            .iter()
            .map(|(key, entry)| Command::put(key.clone(), entry))
            .collect();
        let batch = WalEntry::new(data.counter, commands);
        let payload = batch.encode()?;

        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            let mut writer = BufWriter::new(file);
            frame::write_record(&mut writer, &payload)?;
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }
        fs::rename(&tmp, &self.path)?;

        // Reopen so subsequent appends target the rotated file
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        self.size = self.file.metadata()?.len();
        info!(
            path = %self.path.display(),
            entries = data.entries.len(),
            size = self.size,
            "append log rotated"
        );
        Ok(())
    }
}

impl std::fmt::Debug for AppendLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppendLog")
            .field("path", &self.path)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::read_wal;
    use coffer_core::{Entry, Value};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn batch(tx_id: u64, key: &str) -> WalEntry {
        let entry = Entry::new(Value::Scalar("v".to_string()), tx_id);
        WalEntry::new(tx_id, vec![Command::put(key, &entry)])
    }

    #[test]
    fn test_append_tracks_size() {
        let dir = TempDir::new().unwrap();
        let mut log = AppendLog::open(dir.path()).unwrap();
        assert_eq!(log.size(), 0);
        log.append(&batch(1, "a")).unwrap();
        let on_disk = std::fs::metadata(log.path()).unwrap().len();
        assert_eq!(log.size(), on_disk);
    }

    #[test]
    fn test_reopen_resumes_size() {
        let dir = TempDir::new().unwrap();
        {
            let mut log = AppendLog::open(dir.path()).unwrap();
            log.append(&batch(1, "a")).unwrap();
        }
        let log = AppendLog::open(dir.path()).unwrap();
        assert!(log.size() > 0);
    }

    #[test]
    fn test_should_rotate_thresholds() {
        let dir = TempDir::new().unwrap();
        let mut log = AppendLog::open(dir.path()).unwrap();
        log.append(&batch(1, "a")).unwrap();
        assert!(!log.should_rotate(0), "target 0 disables rotation");
        assert!(log.should_rotate(1));
        assert!(!log.should_rotate(1024 * 1024));
    }

    #[test]
    fn test_rotate_rewrites_full_state() {
        let dir = TempDir::new().unwrap();
        let mut log = AppendLog::open(dir.path()).unwrap();
        for i in 1..=5u64 {
            log.append(&batch(i, &format!("k{i}"))).unwrap();
        }

        let mut entries = BTreeMap::new();
        entries.insert(
            "k5".to_string(),
            Entry::new(Value::Scalar("final".to_string()), 5),
        );
        let data = DataFile::new(5, entries);
        log.rotate(&data).unwrap();

        // The rotated file holds exactly one batch describing live state
        let batches = read_wal(log.path()).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].tx_id, 5);
        assert_eq!(batches[0].commands.len(), 1);
        assert_eq!(batches[0].commands[0].key, "k5");
        assert!(!dir.path().join(AOF_TMP_FILENAME).exists());
    }

    #[test]
    fn test_append_after_rotate() {
        let dir = TempDir::new().unwrap();
        let mut log = AppendLog::open(dir.path()).unwrap();
        log.append(&batch(1, "a")).unwrap();
        log.rotate(&DataFile::new(1, BTreeMap::new())).unwrap();
        log.append(&batch(2, "b")).unwrap();
        let batches = read_wal(log.path()).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].tx_id, 2);
    }
}

//! Write-ahead log
//!
//! One [`WalEntry`] is one durable, atomic batch: a transaction id plus
//! the ordered commands the batch applied. Batches are appended in
//! increasing transaction-id order and the file is removed (reset) only
//! after a snapshot has persisted their effects.
//!
//! A single `put` or `delete` appends a one-command batch; a committed
//! transaction appends one batch covering all of its staged writes.

use crate::frame::{self, ReadOutcome};
use coffer_core::{Entry, Kind, Result, Value};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// WAL file name under the data directory
pub const WAL_FILENAME: &str = "wal.db";

/// Operation kind recorded in a WAL command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOp {
    /// Insert or replace the entry for a key
    Put,
    /// Remove the key
    Delete,
}

/// One logged operation within a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Operation kind
    pub op: CommandOp,
    /// Key the operation targets
    pub key: String,
    /// Payload written; `None` for deletes
    pub value: Option<Value>,
    /// Resulting entry version (the batch's transaction id)
    pub version: u64,
    /// Type tag of the affected entry
    pub kind: Kind,
}

impl Command {
    /// Command recording a put of `entry` under `key`
    pub fn put(key: impl Into<String>, entry: &Entry) -> Self {
        Command {
            op: CommandOp::Put,
            key: key.into(),
            value: Some(entry.value.clone()),
            version: entry.version,
            kind: entry.kind(),
        }
    }

    /// Command recording a delete of `key`
    pub fn delete(key: impl Into<String>, version: u64, kind: Kind) -> Self {
        Command {
            op: CommandOp::Delete,
            key: key.into(),
            value: None,
            version,
            kind,
        }
    }
}

/// One durable, atomic batch of commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Transaction id assigned to the whole batch
    pub tx_id: u64,
    /// Commands in application order; last command for a key wins
    pub commands: Vec<Command>,
}

impl WalEntry {
    /// Create a batch for a transaction id
    pub fn new(tx_id: u64, commands: Vec<Command>) -> Self {
        WalEntry { tx_id, commands }
    }

    /// Encode to the framed payload bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from framed payload bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Appends batches to the WAL file
///
/// Every append is flushed and synced to stable storage before it
/// returns; a failed append leaves the triggering write unacknowledged.
pub struct WalWriter {
    file: File,
    path: PathBuf,
}

impl WalWriter {
    /// Open (or create) the WAL file for appending
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(WalWriter { file, path })
    }

    /// Append one batch and force it to stable storage
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        let payload = entry.encode()?;
        frame::write_record(&mut self.file, &payload)?;
        self.file.flush()?;
        self.file.sync_data()?;
        debug!(tx_id = entry.tx_id, commands = entry.commands.len(), "wal append");
        Ok(())
    }

    /// Truncate the log after its effects have reached a snapshot
    pub fn reset(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_data()?;
        debug!(path = %self.path.display(), "wal reset");
        Ok(())
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read every valid batch from a WAL file, in file order
///
/// Absence of the file is the clean-shutdown case and yields no batches.
/// A torn or checksum-failing record marks the crash point: the scan
/// stops there and everything before it is returned.
pub fn read_wal(path: &Path) -> Result<Vec<WalEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = BufReader::new(File::open(path)?);
    let mut batches = Vec::new();
    loop {
        match frame::read_record(&mut reader)? {
            ReadOutcome::Record(payload) => batches.push(WalEntry::decode(&payload)?),
            ReadOutcome::Eof => break,
            ReadOutcome::Invalid(reason) => {
                warn!(
                    path = %path.display(),
                    batches = batches.len(),
                    reason,
                    "stopping wal scan at invalid record"
                );
                break;
            }
        }
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};
    use tempfile::TempDir;

    fn scalar_entry(payload: &str, version: u64) -> Entry {
        Entry::new(Value::Scalar(payload.to_string()), version)
    }

    fn batch(tx_id: u64, key: &str, payload: &str) -> WalEntry {
        WalEntry::new(tx_id, vec![Command::put(key, &scalar_entry(payload, tx_id))])
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(WAL_FILENAME);
        let mut writer = WalWriter::open(&path).unwrap();
        writer.append(&batch(1, "a", "1")).unwrap();
        writer.append(&batch(2, "b", "2")).unwrap();

        let batches = read_wal(&path).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].tx_id, 1);
        assert_eq!(batches[1].tx_id, 2);
        assert_eq!(batches[1].commands[0].key, "b");
    }

    #[test]
    fn test_missing_file_yields_no_batches() {
        let dir = TempDir::new().unwrap();
        let batches = read_wal(&dir.path().join(WAL_FILENAME)).unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn test_reset_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(WAL_FILENAME);
        let mut writer = WalWriter::open(&path).unwrap();
        writer.append(&batch(1, "a", "1")).unwrap();
        writer.reset().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert!(read_wal(&path).unwrap().is_empty());
    }

    #[test]
    fn test_append_after_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(WAL_FILENAME);
        let mut writer = WalWriter::open(&path).unwrap();
        writer.append(&batch(1, "a", "1")).unwrap();
        writer.reset().unwrap();
        writer.append(&batch(2, "b", "2")).unwrap();

        let batches = read_wal(&path).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].tx_id, 2);
    }

    #[test]
    fn test_torn_tail_keeps_earlier_batches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(WAL_FILENAME);
        let mut writer = WalWriter::open(&path).unwrap();
        writer.append(&batch(1, "a", "1")).unwrap();
        writer.append(&batch(2, "b", "2")).unwrap();
        drop(writer);

        // Chop a few bytes off the last record to simulate a crash mid-append
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        let len = file.metadata().unwrap().len();
        file.set_len(len - 4).unwrap();

        let batches = read_wal(&path).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].tx_id, 1);
    }

    #[test]
    fn test_corrupt_record_stops_scan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(WAL_FILENAME);
        let mut writer = WalWriter::open(&path).unwrap();
        writer.append(&batch(1, "a", "1")).unwrap();
        writer.append(&batch(2, "b", "2")).unwrap();
        drop(writer);

        // Flip a byte in the middle of the file
        let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        let len = file.metadata().unwrap().len();
        file.seek(SeekFrom::Start(len / 2)).unwrap();
        file.write_all(&[0xff]).unwrap();

        let batches = read_wal(&path).unwrap();
        assert!(batches.len() < 2);
    }

    #[test]
    fn test_delete_command_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(WAL_FILENAME);
        let mut writer = WalWriter::open(&path).unwrap();
        let entry = WalEntry::new(3, vec![Command::delete("gone", 3, Kind::List)]);
        writer.append(&entry).unwrap();

        let batches = read_wal(&path).unwrap();
        assert_eq!(batches[0].commands[0].op, CommandOp::Delete);
        assert_eq!(batches[0].commands[0].value, None);
        assert_eq!(batches[0].commands[0].kind, Kind::List);
    }
}

//! Record framing shared by the WAL and the append-only log
//!
//! Each record on disk is:
//!
//! ```text
//! ┌─────────┬─────────┬──────────────┐
//! │ Len (4) │ CRC (4) │ Data (Len)   │
//! └─────────┴─────────┴──────────────┘
//! ```
//!
//! Length and CRC are little-endian; the CRC32 covers the data bytes
//! only. A record whose length or checksum cannot be validated is a
//! crash artifact and terminates the scan.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use coffer_core::{Error, Result};
use std::io::{Read, Write};

/// Bytes of framing overhead per record
pub const HEADER_SIZE: u64 = 8;

/// Largest record the reader will accept
///
/// Guards against interpreting garbage as a multi-gigabyte length and
/// allocating for it.
const MAX_RECORD_SIZE: u32 = 256 * 1024 * 1024;

/// Write one framed record
pub fn write_record<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let crc = crc32fast::hash(payload);
    writer.write_u32::<LittleEndian>(payload.len() as u32)?;
    writer.write_u32::<LittleEndian>(crc)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Outcome of reading one record
pub enum ReadOutcome {
    /// A complete, checksum-valid record
    Record(Vec<u8>),
    /// Clean end of file
    Eof,
    /// Torn or checksum-failing record; scanning must stop here
    Invalid(String),
}

/// Read one framed record, tolerating a torn tail
pub fn read_record<R: Read>(reader: &mut R) -> Result<ReadOutcome> {
    let len = match reader.read_u32::<LittleEndian>() {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(ReadOutcome::Eof),
        Err(e) => return Err(Error::Io(e)),
    };
    if len > MAX_RECORD_SIZE {
        return Ok(ReadOutcome::Invalid(format!(
            "record length {} exceeds maximum",
            len
        )));
    }
    let expected_crc = match reader.read_u32::<LittleEndian>() {
        Ok(crc) => crc,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Ok(ReadOutcome::Invalid("truncated record header".to_string()))
        }
        Err(e) => return Err(Error::Io(e)),
    };
    let mut payload = vec![0u8; len as usize];
    if let Err(e) = reader.read_exact(&mut payload) {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(ReadOutcome::Invalid("truncated record payload".to_string()));
        }
        return Err(Error::Io(e));
    }
    let actual_crc = crc32fast::hash(&payload);
    if actual_crc != expected_crc {
        return Ok(ReadOutcome::Invalid(format!(
            "checksum mismatch: expected {:#010x}, found {:#010x}",
            expected_crc, actual_crc
        )));
    }
    Ok(ReadOutcome::Record(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_roundtrip_single_record() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"hello").unwrap();
        let mut cursor = Cursor::new(buf);
        match read_record(&mut cursor).unwrap() {
            ReadOutcome::Record(payload) => assert_eq!(payload, b"hello"),
            _ => panic!("expected a record"),
        }
        assert!(matches!(read_record(&mut cursor).unwrap(), ReadOutcome::Eof));
    }

    #[test]
    fn test_torn_payload_is_invalid_not_error() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"hello world").unwrap();
        buf.truncate(buf.len() - 3);
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            read_record(&mut cursor).unwrap(),
            ReadOutcome::Invalid(_)
        ));
    }

    #[test]
    fn test_corrupted_payload_fails_checksum() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"hello").unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xff;
        let mut cursor = Cursor::new(buf);
        match read_record(&mut cursor).unwrap() {
            ReadOutcome::Invalid(reason) => assert!(reason.contains("checksum")),
            _ => panic!("expected checksum failure"),
        }
    }

    #[test]
    fn test_absurd_length_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            read_record(&mut cursor).unwrap(),
            ReadOutcome::Invalid(_)
        ));
    }
}

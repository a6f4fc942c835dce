use crate::errors::JournalError;
use crate::frame::{FrameKind, JournalHeader, RecordFrame};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Options for [`JournalWriter::open`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// fsync after every frame (default: false).
    pub sync: bool,
    /// Create the file when missing (default: true).
    pub create: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync: false,
            create: true,
        }
    }
}

/// Appends JSON records to a journal file.
///
/// A new or empty file gets a header on open; an existing file must start
/// with a valid header and is always appended to, never rewritten. The one
/// exception is a frame whose own append failed: it is truncated away.
pub struct JournalWriter {
    file: File,
    sync: bool,
    /// Start of a failed frame that could not be truncated.
    poisoned: Option<u64>,
}

impl JournalWriter {
    /// Opens `path` for appending, writing a header if the file is empty.
    ///
    /// # Errors
    ///
    /// [`JournalError::ShortFile`] or [`JournalError::InvalidHeader`] when
    /// the file holds something other than a journal.
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, JournalError> {
        let mut file = OpenOptions::new()
            .create(options.create)
            .read(true)
            .write(true)
            .open(path)?;

        match file.metadata()?.len() {
            0 => {
                file.write_all(&JournalHeader::new().to_bytes())?;
            }
            len if len < JournalHeader::HEADER_SIZE as u64 => {
                return Err(JournalError::ShortFile { len });
            }
            _ => {
                let mut header = [0u8; JournalHeader::HEADER_SIZE];
                file.read_exact(&mut header)?;
                JournalHeader::from_bytes(&header)?;
            }
        }
        file.seek(SeekFrom::End(0))?;

        let mut writer = Self {
            file,
            sync: options.sync,
            poisoned: None,
        };
        writer.flush()?;
        Ok(writer)
    }

    /// Serializes `record` as JSON and appends it as one frame.
    pub fn append_record<T: Serialize>(&mut self, record: &T) -> Result<(), JournalError> {
        let payload = serde_json::to_vec(record).map_err(JournalError::Encode)?;
        self.append_raw(FrameKind::Record, &payload)
    }

    /// Appends one frame of `kind` carrying `payload`.
    ///
    /// Header and payload go out in a single write, so a crash leaves at
    /// most one torn frame at the tail. If the write or flush fails, the file
    /// is cut back to where the frame began before the error is returned, so
    /// later frames never land behind a partial one.
    ///
    /// # Errors
    ///
    /// The I/O error of the failed write, or [`JournalError::Poisoned`] on
    /// every call after a rollback failed.
    pub fn append_raw(&mut self, kind: FrameKind, payload: &[u8]) -> Result<(), JournalError> {
        if let Some(offset) = self.poisoned {
            return Err(JournalError::Poisoned { offset });
        }
        let frame = RecordFrame::for_payload(kind, payload)?;
        let mut buf = Vec::with_capacity(RecordFrame::FRAME_HEADER_SIZE + payload.len());
        buf.extend_from_slice(&frame.to_bytes());
        buf.extend_from_slice(payload);

        let start = self.file.stream_position()?;
        let written = match self.file.write_all(&buf) {
            Ok(()) => self.flush(),
            Err(e) => Err(e.into()),
        };
        if written.is_err() && self.rollback(start).is_err() {
            self.poisoned = Some(start);
        }
        written
    }

    /// Truncates the file to `offset` and moves the cursor there.
    fn rollback(&mut self, offset: u64) -> std::io::Result<()> {
        self.file.set_len(offset)?;
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), JournalError> {
        self.file.flush()?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Flushes and closes the file, reporting any error that `Drop` would
    /// swallow.
    pub fn finish(mut self) -> Result<(), JournalError> {
        self.flush()
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{JournalReader, ReadMode};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn rollback_removes_partial_frame() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.csj");
        let mut writer = JournalWriter::open(&path, WriteOptions::default()).unwrap();
        writer.append_record(&json!({"n": 1})).unwrap();

        // What a short write would leave behind.
        let start = writer.file.stream_position().unwrap();
        writer.file.write_all(&[0xAB; 7]).unwrap();
        writer.rollback(start).unwrap();
        writer.append_record(&json!({"n": 2})).unwrap();
        writer.finish().unwrap();

        let mut reader = JournalReader::open(&path, ReadMode::Strict).unwrap();
        let mut seen = Vec::new();
        while let Some(record) = reader.read_record::<Value>().unwrap() {
            seen.push(record["n"].as_u64().unwrap());
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn failed_write_without_rollback_poisons_writer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.csj");
        JournalWriter::open(&path, WriteOptions::default())
            .unwrap()
            .finish()
            .unwrap();
        let len = std::fs::metadata(&path).unwrap().len();

        // A read-only handle fails both the write and the truncate.
        let mut file = File::open(&path).unwrap();
        file.seek(SeekFrom::End(0)).unwrap();
        let mut writer = JournalWriter {
            file,
            sync: false,
            poisoned: None,
        };

        assert!(matches!(
            writer.append_record(&json!(1)),
            Err(JournalError::Io(_))
        ));
        assert!(matches!(
            writer.append_record(&json!(2)),
            Err(JournalError::Poisoned { offset }) if offset == len
        ));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len);
    }
}

use crate::errors::JournalError;
use crate::frame::{FrameKind, JournalHeader, RecordFrame};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// How the reader treats a damaged tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Truncated or checksum-failing frames are errors.
    Strict,
    /// A truncated or checksum-failing frame ends the journal.
    Permissive,
}

/// Reads records from a journal file in append order.
pub struct JournalReader {
    file: BufReader<File>,
    len: u64,
    mode: ReadMode,
    position: u64,
}

impl JournalReader {
    /// Opens a journal and validates its header.
    pub fn open<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Self, JournalError> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();

        let mut header = [0u8; JournalHeader::HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;
        JournalHeader::from_bytes(&header)?;

        Ok(Self {
            file: BufReader::new(file),
            len,
            mode,
            position: JournalHeader::HEADER_SIZE as u64,
        })
    }

    /// Byte offset just past the last frame read successfully.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` at end-of-file, or at a damaged tail in permissive
    /// mode. The position only advances past complete, intact frames.
    pub fn read_frame(&mut self) -> Result<Option<(FrameKind, Vec<u8>)>, JournalError> {
        if self.position >= self.len {
            return Ok(None);
        }

        let mut header = [0u8; RecordFrame::FRAME_HEADER_SIZE];
        if !self.read_exact_or_eof(&mut header)? {
            return self.damaged_tail(JournalError::TruncatedFrame {
                offset: self.position,
            });
        }
        let frame = RecordFrame::from_bytes(&header, self.position)?;

        let mut payload = vec![0u8; frame.len as usize];
        if !self.read_exact_or_eof(&mut payload)? {
            return self.damaged_tail(JournalError::TruncatedFrame {
                offset: self.position,
            });
        }
        if !frame.verify(&payload) {
            return self.damaged_tail(JournalError::InvalidFrame {
                offset: self.position,
                reason: "payload checksum mismatch".to_string(),
            });
        }

        self.position += (RecordFrame::FRAME_HEADER_SIZE + payload.len()) as u64;
        Ok(Some((frame.kind, payload)))
    }

    /// Reads and decodes the next record, skipping unknown frame kinds.
    pub fn read_record<T: DeserializeOwned>(&mut self) -> Result<Option<T>, JournalError> {
        loop {
            let offset = self.position;
            match self.read_frame()? {
                None => return Ok(None),
                Some((FrameKind::Record, payload)) => {
                    return serde_json::from_slice(&payload)
                        .map(Some)
                        .map_err(|source| JournalError::Decode { offset, source });
                }
                Some((FrameKind::Unknown(_), _)) => continue,
            }
        }
    }

    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<bool, JournalError> {
        match self.file.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn damaged_tail<T>(&mut self, error: JournalError) -> Result<Option<T>, JournalError> {
        match self.mode {
            ReadMode::Strict => Err(error),
            ReadMode::Permissive => {
                // Later reads must not resume inside the damaged frame.
                self.len = self.position;
                Ok(None)
            }
        }
    }
}

use thiserror::Error;

/// Errors raised while writing or replaying a journal.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Underlying file I/O failed.
    #[error("journal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The file does not start with a supported journal header.
    #[error("invalid journal header: {0}")]
    InvalidHeader(String),
    /// The file has content but is too short to hold a header.
    #[error("file of {len} bytes is too short to be a journal")]
    ShortFile {
        /// File length in bytes.
        len: u64,
    },
    /// A frame header is malformed, or its payload fails the checksum.
    #[error("invalid frame at offset {offset}: {reason}")]
    InvalidFrame {
        /// Offset of the frame header.
        offset: u64,
        /// What was wrong with it.
        reason: String,
    },
    /// The file ends inside a frame.
    #[error("truncated frame at offset {offset}")]
    TruncatedFrame {
        /// Offset of the incomplete frame.
        offset: u64,
    },
    /// A payload is larger than a frame can carry.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Frame payload limit.
        max: u32,
    },
    /// An earlier append failed and its partial frame could not be removed.
    /// The writer refuses further appends; reopen the journal in permissive
    /// mode to cut the tail.
    #[error("journal writer is unusable: partial frame at offset {offset} could not be rolled back")]
    Poisoned {
        /// Offset where the failed frame started.
        offset: u64,
    },
    /// A record could not be serialized.
    #[error("record could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    /// An intact frame holds a record of the wrong shape.
    #[error("record at offset {offset} could not be decoded: {source}")]
    Decode {
        /// Offset of the frame header.
        offset: u64,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
}

//! Framed, append-only journal files for commitstore.
//!
//! A journal is a 16-byte header followed by record frames. Each frame
//! carries one JSON-encoded record. The storage substrate in
//! `commitstore-store` writes every table mutation as a record and replays
//! the journal on open.
//!
//! ```rust,no_run
//! use commitstore_journal::{JournalReader, JournalWriter, ReadMode, WriteOptions};
//! use serde_json::{json, Value};
//!
//! let mut writer = JournalWriter::open("tables.csj", WriteOptions::default())?;
//! writer.append_record(&json!({"put": {"table": "commits"}}))?;
//! writer.finish()?;
//!
//! let mut reader = JournalReader::open("tables.csj", ReadMode::Strict)?;
//! while let Some(record) = reader.read_record::<Value>()? {
//!     println!("{}", record);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

/// Error types for journal operations.
pub mod errors;
/// Header and frame layout.
pub mod frame;
/// Journal reader implementation.
pub mod reader;
/// Journal writer implementation.
pub mod writer;

pub use errors::JournalError;
pub use frame::{FrameKind, JournalHeader, RecordFrame};
pub use reader::{JournalReader, ReadMode};
pub use writer::{JournalWriter, WriteOptions};

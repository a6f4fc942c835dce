//! Append-only event commit store.
//!
//! Commits are stored in one table keyed by aggregate id and version, so a
//! conditional insert detects concurrent writers of the same version. A
//! global index over a constant partition key and the commit id gives an
//! ordered feed of the whole log.
//!
//! Module map:
//! - [`substrate`]: the [`StorageClient`] interface and request types
//! - [`memory`], [`journal`]: volatile and durable substrates
//! - [`codec`]: commit to item conversion
//! - [`sequence`]: commit id strategies
//! - [`writer`], [`reader`], [`schema`]: the store components
//! - [`store`]: the [`CommitStore`] facade
#![deny(missing_docs)]

/// Typed attribute values.
pub mod attribute;
/// Commit to item conversion.
pub mod codec;
/// Store configuration.
pub mod config;
/// Error types.
pub mod error;
/// Journal-backed substrate.
pub mod journal;
/// In-memory substrate.
pub mod memory;
/// Per-aggregate and global reads.
pub mod reader;
/// Table provisioning.
pub mod schema;
/// Commit id allocation.
pub mod sequence;
/// The commit store facade.
pub mod store;
/// Storage substrate interface.
pub mod substrate;
/// Appending commits.
pub mod writer;

pub use commitstore_journal::ReadMode;

pub use attribute::{AttributeType, AttributeValue, Item};
pub use config::{ConfigError, StoreConfig};
pub use error::{DecodeError, StorageError, StoreError};
pub use journal::{JournalOptions, JournalStorage};
pub use memory::MemoryStorage;
pub use reader::{CommitReader, ScanCursor, ScanPage, ScanPosition};
pub use schema::SchemaManager;
pub use sequence::{SequenceStrategy, Sequencer};
pub use store::CommitStore;
pub use substrate::{
    IndexDefinition, KeyAttribute, KeySchema, QueryOutput, QueryRequest, RangeBound,
    StorageClient, TableDefinition,
};
pub use writer::CommitWriter;

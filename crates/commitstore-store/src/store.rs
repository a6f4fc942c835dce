//! The [`CommitStore`] facade.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::reader::{CommitReader, ScanPage, ScanPosition};
use crate::schema::SchemaManager;
use crate::sequence::SequenceStrategy;
use crate::substrate::StorageClient;
use crate::writer::CommitWriter;
use commitstore_core::{AggregateId, Clock, Commit, CommitId, CommittedRecord, SystemClock};
use std::sync::Arc;

/// An event commit store over a storage substrate.
///
/// Holds no mutable state of its own; share it across threads behind an
/// `Arc` or by reference.
///
/// ```rust
/// use commitstore_core::{AggregateId, Commit};
/// use commitstore_store::{CommitStore, MemoryStorage, StoreConfig};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let store = CommitStore::new(Arc::new(MemoryStorage::new()), StoreConfig::default());
/// store.create_schema()?;
///
/// let order = AggregateId::parse("order-1")?;
/// store.append(Commit::new(order.clone(), 0, vec![json!({"type": "Placed"})]))?;
/// assert_eq!(store.query(&order, 0)?.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct CommitStore<S: ?Sized> {
    config: StoreConfig,
    writer: CommitWriter<S>,
    reader: CommitReader<S>,
    schema: SchemaManager<S>,
}

impl<S: StorageClient + ?Sized> CommitStore<S> {
    /// Creates a store stamping commits with the system clock.
    pub fn new(storage: Arc<S>, config: StoreConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    /// Creates a store stamping commits with `clock`.
    pub fn with_clock(storage: Arc<S>, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let writer = CommitWriter::new(
            Arc::clone(&storage),
            config.commit_table.as_str(),
            config.sequencer(),
            clock,
        );
        let reader = CommitReader::new(
            Arc::clone(&storage),
            config.commit_table.as_str(),
            config.commit_index.as_str(),
            config.sequence,
            config.page_size,
        );
        let schema = SchemaManager::new(storage, config.clone());
        Self {
            config,
            writer,
            reader,
            schema,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Commit id strategy in use.
    pub fn strategy(&self) -> SequenceStrategy {
        self.config.sequence
    }

    /// Table provisioning for this store.
    pub fn schema(&self) -> &SchemaManager<S> {
        &self.schema
    }

    /// Creates the tables this store needs.
    pub fn create_schema(&self) -> Result<(), StoreError> {
        self.schema.create_schema()
    }

    /// Deletes the tables this store uses, with all their data.
    pub fn drop_schema(&self) -> Result<(), StoreError> {
        self.schema.drop_schema()
    }

    /// See [`CommitWriter::append`].
    pub fn append(&self, commit: Commit) -> Result<CommittedRecord, StoreError> {
        self.writer.append(commit)
    }

    /// See [`CommitReader::query`].
    pub fn query(
        &self,
        aggregate_id: &AggregateId,
        min_version: u64,
    ) -> Result<Vec<CommittedRecord>, StoreError> {
        self.reader.query(aggregate_id, min_version)
    }

    /// See [`CommitReader::scan`].
    pub fn scan(&self, min_commit_id: Option<&CommitId>) -> Result<Vec<CommittedRecord>, StoreError> {
        self.reader.scan(min_commit_id)
    }

    /// See [`CommitReader::scan_page`].
    pub fn scan_page(&self, position: &ScanPosition, limit: usize) -> Result<ScanPage, StoreError> {
        self.reader.scan_page(position, limit)
    }
}

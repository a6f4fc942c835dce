//! Appending commits.

use crate::codec;
use crate::error::{StorageError, StoreError};
use crate::sequence::Sequencer;
use crate::substrate::StorageClient;
use commitstore_core::{Clock, Commit, CommittedRecord};
use std::sync::Arc;
use tracing::debug;

/// Appends commits with a conditional insert per (aggregate, version).
pub struct CommitWriter<S: ?Sized> {
    storage: Arc<S>,
    table: String,
    sequencer: Sequencer,
    clock: Arc<dyn Clock>,
}

impl<S: StorageClient + ?Sized> CommitWriter<S> {
    /// Creates a writer for `table`.
    pub fn new(
        storage: Arc<S>,
        table: impl Into<String>,
        sequencer: Sequencer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            table: table.into(),
            sequencer,
            clock,
        }
    }

    /// Allocates a commit id and stores `commit` under it.
    ///
    /// Exactly one of two concurrent appends at the same aggregate and
    /// version succeeds; the other gets [`StoreError::VersionConflict`].
    /// Nothing is retried and nothing is written on failure, although the
    /// counter strategy will have consumed an id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::VersionConflict`] if the version is taken.
    /// - [`StoreError::Validation`] if an event is nested deeper than
    ///   [`codec::MAX_EVENT_DEPTH`] or the substrate rejects the item.
    /// - [`StoreError::Storage`] for any other substrate fault.
    pub fn append(&self, commit: Commit) -> Result<CommittedRecord, StoreError> {
        // Checked before allocation so a rejected commit burns no id.
        codec::validate_events(&commit.events)?;
        let now = self.clock.now_millis();
        let commit_id = self.sequencer.allocate(&*self.storage, &commit, now)?;
        let record = CommittedRecord::new(commit, commit_id, now);
        let item = codec::encode(&record)?;

        match self.storage.put_if_absent(&self.table, item) {
            Ok(()) => {}
            Err(StorageError::ConditionalCheckFailed { .. }) => {
                return Err(StoreError::VersionConflict {
                    aggregate_id: record.aggregate_id,
                    version: record.version,
                })
            }
            Err(e) => return Err(e.into()),
        }

        debug!(
            aggregate_id = %record.aggregate_id,
            version = record.version,
            commit_id = %record.commit_id,
            events = record.events.len(),
            "appended commit"
        );
        Ok(record)
    }
}

use crate::commit_id::CommitId;
use crate::identifiers::AggregateId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A batch of events to append for one aggregate at one version.
///
/// `version` is assigned by the caller; the store only guarantees that no
/// two commits share the same (`aggregate_id`, `version`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Aggregate the events belong to.
    pub aggregate_id: AggregateId,
    /// Caller-assigned, per-aggregate version.
    pub version: u64,
    /// Opaque application events, stored as a single blob.
    pub events: Vec<Value>,
}

impl Commit {
    /// Creates a commit.
    pub fn new(aggregate_id: AggregateId, version: u64, events: Vec<Value>) -> Self {
        Self {
            aggregate_id,
            version,
            events,
        }
    }
}

/// A commit as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedRecord {
    /// Global ordering key assigned at append time.
    pub commit_id: CommitId,
    /// Wall-clock milliseconds at append time; not an ordering guarantee.
    pub committed_at: u64,
    /// Aggregate the events belong to.
    pub aggregate_id: AggregateId,
    /// Caller-assigned, per-aggregate version.
    pub version: u64,
    /// Opaque application events.
    pub events: Vec<Value>,
}

impl CommittedRecord {
    /// Stamps a commit with its store-assigned fields.
    pub fn new(commit: Commit, commit_id: CommitId, committed_at: u64) -> Self {
        Self {
            commit_id,
            committed_at,
            aggregate_id: commit.aggregate_id,
            version: commit.version,
            events: commit.events,
        }
    }

    /// Returns the caller-supplied part of the record.
    pub fn commit(&self) -> Commit {
        Commit::new(self.aggregate_id.clone(), self.version, self.events.clone())
    }
}

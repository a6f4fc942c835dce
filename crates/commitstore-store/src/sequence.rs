//! Commit id allocation.
//!
//! Two strategies produce the global ordering key:
//!
//! - [`SequenceStrategy::Counter`] increments a shared counter row before
//!   every append. Ids are strictly increasing across all writers, at the
//!   cost of a second round trip per append and a single contended row.
//! - [`SequenceStrategy::Derived`] builds the id from the clock reading and
//!   the aggregate id. No shared state and one write per append, but ids
//!   are only monotonic within one process with a monotonic clock. Appends
//!   from different writers in the same millisecond are ordered by
//!   aggregate id, not by when they happened. Use the counter when
//!   consumers need a strict cross-writer order.

use crate::attribute::{AttributeType, AttributeValue, Item};
use crate::error::StoreError;
use crate::substrate::StorageClient;
use commitstore_core::{Commit, CommitId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Counter table partition key.
pub const COUNTER_NAME: &str = "name";
/// Counter value attribute.
pub const COUNTER_VALUE: &str = "id";

/// How commit ids are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStrategy {
    /// Shared atomic counter; total order across writers.
    #[default]
    Counter,
    /// Timestamp plus aggregate id; per-process order only.
    Derived,
}

impl SequenceStrategy {
    /// Stored type of the commit id attribute.
    pub fn attribute_type(self) -> AttributeType {
        match self {
            SequenceStrategy::Counter => AttributeType::N,
            SequenceStrategy::Derived => AttributeType::S,
        }
    }

    /// The smallest commit id this strategy can issue. Scanning from it
    /// returns the whole log.
    pub fn min_commit_id(self) -> CommitId {
        match self {
            SequenceStrategy::Counter => CommitId::Sequence(0),
            // Derived ids start with a 17-digit timestamp, all of which sort
            // at or after "0".
            SequenceStrategy::Derived => CommitId::Derived("0".to_string()),
        }
    }

    /// Parses a commit id as issued by this strategy.
    pub fn parse_commit_id(self, text: &str) -> Result<CommitId, StoreError> {
        match self {
            SequenceStrategy::Counter => text.parse().map(CommitId::Sequence).map_err(|_| {
                StoreError::Validation(format!("commit id must be an integer: {:?}", text))
            }),
            SequenceStrategy::Derived if text.is_empty() => {
                Err(StoreError::Validation("commit id must not be empty".to_string()))
            }
            SequenceStrategy::Derived => Ok(CommitId::Derived(text.to_string())),
        }
    }
}

impl fmt::Display for SequenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceStrategy::Counter => f.write_str("counter"),
            SequenceStrategy::Derived => f.write_str("derived"),
        }
    }
}

impl FromStr for SequenceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(SequenceStrategy::Counter),
            "derived" => Ok(SequenceStrategy::Derived),
            other => Err(format!("unknown sequence strategy: {}", other)),
        }
    }
}

/// Allocates commit ids for one store.
#[derive(Debug, Clone)]
pub enum Sequencer {
    /// Shared counter row.
    Counter {
        /// Counter table.
        table: String,
        /// Counter row name.
        name: String,
    },
    /// Clock plus aggregate id.
    Derived,
}

impl Sequencer {
    /// Strategy implemented by this sequencer.
    pub fn strategy(&self) -> SequenceStrategy {
        match self {
            Sequencer::Counter { .. } => SequenceStrategy::Counter,
            Sequencer::Derived => SequenceStrategy::Derived,
        }
    }

    /// Allocates the id for `commit`, stamped at `now_millis`.
    ///
    /// The counter strategy performs exactly one counter increment; a value
    /// is consumed even if the append that follows fails, so counter ids may
    /// have gaps. The derived strategy touches no storage.
    ///
    /// # Errors
    ///
    /// Storage faults from the increment are returned unchanged (wrapped in
    /// [`StoreError`]). A counter row holding something other than a
    /// non-negative integer, or a clock reading outside the calendar range,
    /// yields [`StoreError::Validation`].
    pub fn allocate<S>(
        &self,
        storage: &S,
        commit: &Commit,
        now_millis: u64,
    ) -> Result<CommitId, StoreError>
    where
        S: StorageClient + ?Sized,
    {
        match self {
            Sequencer::Counter { table, name } => {
                let mut key = Item::new();
                key.insert(COUNTER_NAME.to_string(), AttributeValue::string(name.as_str()));
                let value = storage.add_counter(table, key, COUNTER_VALUE, 1)?;
                let id = value
                    .as_number()
                    .filter(|text| !text.starts_with('+'))
                    .and_then(|text| text.parse::<u64>().ok())
                    .ok_or_else(|| {
                        StoreError::Validation(format!(
                            "counter {} in table {} holds {:?}, not a commit id",
                            name, table, value
                        ))
                    })?;
                Ok(CommitId::Sequence(id))
            }
            Sequencer::Derived => Ok(CommitId::derived(now_millis, &commit.aggregate_id)?),
        }
    }
}

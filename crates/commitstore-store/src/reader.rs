//! Reading commits back, per aggregate and in global order.

use crate::attribute::{AttributeValue, Item};
use crate::codec::{self, ACTIVE, ACTIVE_MARKER, AGGREGATE_ID, COMMIT_ID, VERSION};
use crate::error::StoreError;
use crate::sequence::SequenceStrategy;
use crate::substrate::{QueryRequest, RangeBound, StorageClient};
use commitstore_core::{AggregateId, CommitId, CommittedRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Where a global scan starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanPosition {
    /// The beginning of the log.
    #[default]
    Start,
    /// The first commit with an id at or after this one.
    From(CommitId),
    /// The first commit after the one the cursor names.
    After(ScanCursor),
}

/// The last commit a page returned.
///
/// Derived ids repeat when one aggregate commits twice in the same
/// millisecond, so resuming needs the full index position: the commit id and
/// the primary key that breaks ties between equal ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCursor {
    /// Commit id of the last commit returned.
    pub commit_id: CommitId,
    /// Its aggregate.
    pub aggregate_id: AggregateId,
    /// Its version.
    pub version: u64,
}

impl ScanCursor {
    /// Points at `record`.
    pub fn of(record: &CommittedRecord) -> Self {
        Self {
            commit_id: record.commit_id.clone(),
            aggregate_id: record.aggregate_id.clone(),
            version: record.version,
        }
    }

    /// The global index key to resume after.
    fn start_key(&self) -> Item {
        let mut key = Item::new();
        key.insert(ACTIVE.to_string(), AttributeValue::string(ACTIVE_MARKER));
        key.insert(COMMIT_ID.to_string(), codec::commit_id_attribute(&self.commit_id));
        key.insert(
            AGGREGATE_ID.to_string(),
            AttributeValue::string(self.aggregate_id.as_str()),
        );
        key.insert(VERSION.to_string(), AttributeValue::number(self.version));
        key
    }
}

/// One page of the global feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage {
    /// Commits in ascending commit id order.
    pub commits: Vec<CommittedRecord>,
    /// Where the next page starts, or `None` when the feed was exhausted at
    /// the time of the read.
    pub next: Option<ScanPosition>,
}

/// Reads commits from the commit table and its global index.
pub struct CommitReader<S: ?Sized> {
    storage: Arc<S>,
    table: String,
    index: String,
    strategy: SequenceStrategy,
    page_size: Option<usize>,
}

impl<S: StorageClient + ?Sized> CommitReader<S> {
    /// Creates a reader over `table` and its global `index`.
    pub fn new(
        storage: Arc<S>,
        table: impl Into<String>,
        index: impl Into<String>,
        strategy: SequenceStrategy,
        page_size: Option<usize>,
    ) -> Self {
        Self {
            storage,
            table: table.into(),
            index: index.into(),
            strategy,
            page_size,
        }
    }

    /// Returns every commit of `aggregate_id` with `version >= min_version`,
    /// ascending by version.
    ///
    /// Strongly consistent: every append acknowledged before the call is
    /// visible. An aggregate with no commits yields an empty vector.
    pub fn query(
        &self,
        aggregate_id: &AggregateId,
        min_version: u64,
    ) -> Result<Vec<CommittedRecord>, StoreError> {
        let request = QueryRequest::new(
            self.table.as_str(),
            AttributeValue::string(aggregate_id.as_str()),
        )
        .range(RangeBound::AtLeast(AttributeValue::number(min_version)))
        .consistent()
        .limit(self.page_size);

        let commits = self.read_all(request)?;
        debug!(
            aggregate_id = %aggregate_id,
            min_version,
            commits = commits.len(),
            "queried aggregate"
        );
        Ok(commits)
    }

    /// Returns every commit with `commit_id >= min_commit_id` (the whole log
    /// when `None`), ascending by commit id.
    ///
    /// Reads the global index, which is eventually consistent: a commit
    /// acknowledged moments ago may be missing, and under the derived
    /// strategy a commit from another writer may later appear before the
    /// last id returned.
    pub fn scan(
        &self,
        min_commit_id: Option<&CommitId>,
    ) -> Result<Vec<CommittedRecord>, StoreError> {
        let min = min_commit_id
            .cloned()
            .unwrap_or_else(|| self.strategy.min_commit_id());
        let request = self
            .index_request(RangeBound::AtLeast(codec::commit_id_attribute(&min)))
            .limit(self.page_size);

        let commits = self.read_all(request)?;
        debug!(min_commit_id = %min, commits = commits.len(), "scanned commits");
        Ok(commits)
    }

    /// Returns at most `limit` commits of the global feed starting at
    /// `position`, plus the position of the next page.
    ///
    /// Following `next` until it is `None` visits every commit the index held
    /// exactly once, including commits that share a derived id.
    pub fn scan_page(
        &self,
        position: &ScanPosition,
        limit: usize,
    ) -> Result<ScanPage, StoreError> {
        if limit == 0 {
            return Err(StoreError::Validation("scan limit must be at least 1".to_string()));
        }
        let (min, start) = match position {
            ScanPosition::Start => (self.strategy.min_commit_id(), None),
            ScanPosition::From(id) => (id.clone(), None),
            ScanPosition::After(cursor) => (cursor.commit_id.clone(), Some(cursor.start_key())),
        };
        let request = self
            .index_request(RangeBound::AtLeast(codec::commit_id_attribute(&min)))
            .limit(Some(limit))
            .start_after(start);
        let output = self.storage.query(&request)?;
        let commits = decode_all(&output.items)?;

        let next = match (output.last_evaluated_key, commits.last()) {
            (Some(_), Some(last)) => Some(ScanPosition::After(ScanCursor::of(last))),
            _ => None,
        };
        debug!(?position, commits = commits.len(), more = next.is_some(), "scanned page");
        Ok(ScanPage { commits, next })
    }

    fn index_request(&self, bound: RangeBound) -> QueryRequest {
        QueryRequest::new(self.table.as_str(), AttributeValue::string(ACTIVE_MARKER))
            .index(self.index.as_str())
            .range(bound)
    }

    /// Follows `last_evaluated_key` until the substrate reports no more.
    /// Nothing is returned unless every page decodes.
    fn read_all(&self, request: QueryRequest) -> Result<Vec<CommittedRecord>, StoreError> {
        let mut commits = Vec::new();
        let mut start: Option<Item> = None;
        loop {
            let output = self.storage.query(&request.clone().start_after(start))?;
            commits.extend(decode_all(&output.items)?);
            match output.last_evaluated_key {
                Some(key) => start = Some(key),
                None => return Ok(commits),
            }
        }
    }
}

fn decode_all(items: &[Item]) -> Result<Vec<CommittedRecord>, StoreError> {
    items
        .iter()
        .map(|item| codec::decode(item).map_err(StoreError::from))
        .collect()
}

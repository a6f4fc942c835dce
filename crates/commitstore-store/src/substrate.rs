//! The interface the commit store calls its storage substrate through.
//!
//! The substrate offers per-key conditional writes, an atomic counter and
//! range queries over a table or a global index. It has no global sequence
//! and no multi-key transaction; everything else is built on top.

use crate::attribute::{AttributeType, AttributeValue, Item};
use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A key attribute: name plus declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    /// Attribute name.
    pub name: String,
    /// Declared type.
    pub attribute_type: AttributeType,
}

impl KeyAttribute {
    /// Creates a key attribute.
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// Partition key plus optional sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    /// Equality (partition) attribute.
    pub partition: KeyAttribute,
    /// Range (sort) attribute.
    pub sort: Option<KeyAttribute>,
}

/// A global index: a second key schema over the same items.
///
/// Items lacking either index key attribute are not indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Index key schema.
    pub key_schema: KeySchema,
}

/// Table definition passed to [`StorageClient::create_table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Primary key schema.
    pub key_schema: KeySchema,
    /// Global indexes.
    pub global_indexes: Vec<IndexDefinition>,
}

/// Inequality bound on the sort key of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeBound {
    /// `sort >= value`
    AtLeast(AttributeValue),
    /// `sort > value`
    GreaterThan(AttributeValue),
}

/// A range query against a table or one of its global indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Table name.
    pub table: String,
    /// Global index to query instead of the primary key.
    pub index: Option<String>,
    /// Partition key value (equality).
    pub partition_value: AttributeValue,
    /// Sort key bound.
    pub range: Option<RangeBound>,
    /// Read the latest committed state. Not supported on global indexes.
    pub consistent_read: bool,
    /// Maximum number of items to return.
    pub limit: Option<usize>,
    /// Resume after this key (the previous page's `last_evaluated_key`).
    pub exclusive_start_key: Option<Item>,
}

impl QueryRequest {
    /// Starts a query on the primary key of `table`.
    pub fn new(table: impl Into<String>, partition_value: AttributeValue) -> Self {
        Self {
            table: table.into(),
            index: None,
            partition_value,
            range: None,
            consistent_read: false,
            limit: None,
            exclusive_start_key: None,
        }
    }

    /// Queries a global index instead.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Bounds the sort key.
    pub fn range(mut self, bound: RangeBound) -> Self {
        self.range = Some(bound);
        self
    }

    /// Requests a strongly consistent read.
    pub fn consistent(mut self) -> Self {
        self.consistent_read = true;
        self
    }

    /// Limits the page size.
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Resumes after a previous page.
    pub fn start_after(mut self, key: Option<Item>) -> Self {
        self.exclusive_start_key = key;
        self
    }
}

/// One page of query results, ascending by sort key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    /// Matching items.
    pub items: Vec<Item>,
    /// Key of the last returned item when more items remain.
    pub last_evaluated_key: Option<Item>,
}

/// Storage substrate used by the commit store.
///
/// Implementations must make `put_if_absent` and `add_counter` atomic per
/// key; the store relies on nothing else for coordination.
pub trait StorageClient: Send + Sync {
    /// Creates a table and its global indexes.
    fn create_table(&self, definition: &TableDefinition) -> Result<(), StorageError>;

    /// Deletes a table and everything in it.
    fn delete_table(&self, table: &str) -> Result<(), StorageError>;

    /// Atomically adds `delta` to the numeric `attribute` of the item under
    /// `key`, creating the item if absent, and returns the new value.
    fn add_counter(
        &self,
        table: &str,
        key: Item,
        attribute: &str,
        delta: i64,
    ) -> Result<AttributeValue, StorageError>;

    /// Inserts `item` unless an item already exists under its primary key,
    /// in which case [`StorageError::ConditionalCheckFailed`] is returned.
    fn put_if_absent(&self, table: &str, item: Item) -> Result<(), StorageError>;

    /// Runs a range query against a table or global index.
    fn query(&self, request: &QueryRequest) -> Result<QueryOutput, StorageError>;
}

impl<T: StorageClient + ?Sized> StorageClient for Arc<T> {
    fn create_table(&self, definition: &TableDefinition) -> Result<(), StorageError> {
        (**self).create_table(definition)
    }

    fn delete_table(&self, table: &str) -> Result<(), StorageError> {
        (**self).delete_table(table)
    }

    fn add_counter(
        &self,
        table: &str,
        key: Item,
        attribute: &str,
        delta: i64,
    ) -> Result<AttributeValue, StorageError> {
        (**self).add_counter(table, key, attribute, delta)
    }

    fn put_if_absent(&self, table: &str, item: Item) -> Result<(), StorageError> {
        (**self).put_if_absent(table, item)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryOutput, StorageError> {
        (**self).query(request)
    }
}

//! Error types for store operations.

use crate::attribute::AttributeType;
use commitstore_core::AggregateId;
use thiserror::Error;

/// Faults reported by a storage substrate.
///
/// Each condition the core reacts to has its own variant so callers never
/// match on message text.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A conditional write found an existing record under the primary key.
    #[error("conditional check failed on table {table}")]
    ConditionalCheckFailed {
        /// Table the write targeted.
        table: String,
    },
    /// The request or item was malformed.
    #[error("validation error: {0}")]
    Validation(String),
    /// Table or index does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    /// Table already exists.
    #[error("resource in use: {0}")]
    ResourceInUse(String),
    /// Durable journal failure.
    #[error("journal error: {0}")]
    Journal(#[from] commitstore_journal::JournalError),
}

/// A persisted record could not be turned back into a commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A required attribute is absent.
    #[error("missing attribute {0}")]
    MissingAttribute(&'static str),
    /// An attribute has the wrong type tag.
    #[error("attribute {name} has type {found}, expected {expected}")]
    WrongType {
        /// Attribute name.
        name: &'static str,
        /// Expected type.
        expected: AttributeType,
        /// Stored type.
        found: AttributeType,
    },
    /// A numeric attribute is not a non-negative integer.
    #[error("attribute {name} is not a valid integer: {value}")]
    InvalidNumber {
        /// Attribute name.
        name: &'static str,
        /// Stored text.
        value: String,
    },
    /// The events blob is not a JSON array.
    #[error("events blob is invalid: {0}")]
    InvalidEvents(String),
    /// The aggregate id is empty.
    #[error("aggregate id is invalid: {0}")]
    InvalidAggregateId(String),
}

/// Errors returned by the commit store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A commit already exists at this aggregate and version.
    ///
    /// Recoverable: re-read the aggregate and retry with a fresh version.
    #[error("version conflict: {aggregate_id} already has a commit at version {version}")]
    VersionConflict {
        /// Aggregate written to.
        aggregate_id: AggregateId,
        /// Version that was already taken.
        version: u64,
    },
    /// Input was rejected as malformed.
    #[error("validation error: {0}")]
    Validation(String),
    /// Persisted data could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Substrate fault, passed through unchanged.
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Journal(error.into())
    }
}

impl From<StorageError> for StoreError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Validation(message) => StoreError::Validation(message),
            other => StoreError::Storage(other),
        }
    }
}

impl From<commitstore_core::ValidationError> for StoreError {
    fn from(error: commitstore_core::ValidationError) -> Self {
        StoreError::Validation(error.to_string())
    }
}

impl StoreError {
    /// Returns true for [`StoreError::VersionConflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

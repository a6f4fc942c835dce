//! Creating and removing the store's tables.
//!
//! The commit table is keyed by `aggregateId` + `version` and carries one
//! global index keyed by `active` + `commitId`. The counter strategy adds a
//! counter table keyed by `name`. None of these calls are idempotent: a
//! second create reports [`StorageError::ResourceInUse`].
//!
//! [`StorageError::ResourceInUse`]: crate::StorageError::ResourceInUse

use crate::attribute::AttributeType;
use crate::codec::{ACTIVE, AGGREGATE_ID, COMMIT_ID, VERSION};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::sequence::{SequenceStrategy, COUNTER_NAME};
use crate::substrate::{IndexDefinition, KeyAttribute, KeySchema, StorageClient, TableDefinition};
use std::sync::Arc;
use tracing::info;

/// Provisions the tables described by a [`StoreConfig`].
pub struct SchemaManager<S: ?Sized> {
    storage: Arc<S>,
    config: StoreConfig,
}

impl<S: StorageClient + ?Sized> SchemaManager<S> {
    /// Creates a manager for `config`.
    pub fn new(storage: Arc<S>, config: StoreConfig) -> Self {
        Self { storage, config }
    }

    /// Definition of the commit table and its global index.
    pub fn commit_table_definition(&self) -> TableDefinition {
        TableDefinition {
            name: self.config.commit_table.clone(),
            key_schema: KeySchema {
                partition: KeyAttribute::new(AGGREGATE_ID, AttributeType::S),
                sort: Some(KeyAttribute::new(VERSION, AttributeType::N)),
            },
            global_indexes: vec![IndexDefinition {
                name: self.config.commit_index.clone(),
                key_schema: KeySchema {
                    partition: KeyAttribute::new(ACTIVE, AttributeType::S),
                    sort: Some(KeyAttribute::new(
                        COMMIT_ID,
                        self.config.sequence.attribute_type(),
                    )),
                },
            }],
        }
    }

    /// Definition of the counter table.
    pub fn counter_table_definition(&self) -> TableDefinition {
        TableDefinition {
            name: self.config.counter_table.clone(),
            key_schema: KeySchema {
                partition: KeyAttribute::new(COUNTER_NAME, AttributeType::S),
                sort: None,
            },
            global_indexes: Vec::new(),
        }
    }

    /// Creates the commit table and its global index.
    pub fn create_commit_table(&self) -> Result<(), StoreError> {
        self.storage.create_table(&self.commit_table_definition())?;
        info!(
            table = %self.config.commit_table,
            index = %self.config.commit_index,
            sequence = %self.config.sequence,
            "created commit table"
        );
        Ok(())
    }

    /// Creates the counter table.
    pub fn create_counter_table(&self) -> Result<(), StoreError> {
        self.storage.create_table(&self.counter_table_definition())?;
        info!(table = %self.config.counter_table, "created counter table");
        Ok(())
    }

    /// Deletes the commit table and every commit in it.
    pub fn delete_commit_table(&self) -> Result<(), StoreError> {
        self.storage.delete_table(&self.config.commit_table)?;
        info!(table = %self.config.commit_table, "deleted commit table");
        Ok(())
    }

    /// Deletes the counter table.
    pub fn delete_counter_table(&self) -> Result<(), StoreError> {
        self.storage.delete_table(&self.config.counter_table)?;
        info!(table = %self.config.counter_table, "deleted counter table");
        Ok(())
    }

    /// Creates every table the configured strategy needs.
    pub fn create_schema(&self) -> Result<(), StoreError> {
        self.create_commit_table()?;
        if self.config.sequence == SequenceStrategy::Counter {
            self.create_counter_table()?;
        }
        Ok(())
    }

    /// Deletes every table the configured strategy uses.
    pub fn drop_schema(&self) -> Result<(), StoreError> {
        self.delete_commit_table()?;
        if self.config.sequence == SequenceStrategy::Counter {
            self.delete_counter_table()?;
        }
        Ok(())
    }
}

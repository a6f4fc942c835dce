//! In-memory storage substrate.
//!
//! Implements the full [`StorageClient`] contract: key type validation,
//! conditional puts, atomic counters, ordered range queries over tables and
//! global indexes, and paging. Indexes are maintained synchronously, so a
//! write is visible to index queries as soon as it returns.

use crate::attribute::{is_decimal, item_size, AttributeValue, Item};
use crate::error::StorageError;
use crate::substrate::{
    IndexDefinition, KeyAttribute, KeySchema, QueryOutput, QueryRequest, RangeBound,
    StorageClient, TableDefinition,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum item size in bytes (attribute names plus values).
pub const MAX_ITEM_SIZE: usize = 400 * 1024;
/// Maximum size of a string partition key value.
pub const MAX_PARTITION_KEY_SIZE: usize = 2048;
/// Maximum size of a string sort key value.
pub const MAX_SORT_KEY_SIZE: usize = 1024;

fn validation(message: impl Into<String>) -> StorageError {
    StorageError::Validation(message.into())
}

/// Comparable key value. Values of one key attribute share a variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyValue {
    S(String),
    N(i128),
}

impl KeyValue {
    fn from_attribute(
        attribute: &KeyAttribute,
        value: &AttributeValue,
        max_size: usize,
    ) -> Result<Self, StorageError> {
        if value.attribute_type() != attribute.attribute_type {
            return Err(validation(format!(
                "key attribute {} has type {}, expected {}",
                attribute.name,
                value.attribute_type(),
                attribute.attribute_type
            )));
        }
        match value {
            AttributeValue::S(s) if s.is_empty() => Err(validation(format!(
                "key attribute {} must not be empty",
                attribute.name
            ))),
            AttributeValue::S(s) if s.len() > max_size => Err(validation(format!(
                "key attribute {} exceeds {} bytes",
                attribute.name, max_size
            ))),
            AttributeValue::S(s) => Ok(KeyValue::S(s.clone())),
            AttributeValue::N(n) => n
                .parse::<i128>()
                .ok()
                .filter(|_| is_decimal(n))
                .map(KeyValue::N)
                .ok_or_else(|| {
                    validation(format!(
                        "key attribute {} must be an integer, got {:?}",
                        attribute.name, n
                    ))
                }),
        }
    }
}

type PrimaryKey = (KeyValue, Option<KeyValue>);

/// Extracts the key of `item` under `schema`, or `None` if a key attribute
/// is absent.
fn extract_key(schema: &KeySchema, item: &Item) -> Result<Option<PrimaryKey>, StorageError> {
    let partition = match item.get(&schema.partition.name) {
        Some(value) => KeyValue::from_attribute(&schema.partition, value, MAX_PARTITION_KEY_SIZE)?,
        None => return Ok(None),
    };
    let sort = match &schema.sort {
        Some(attribute) => match item.get(&attribute.name) {
            Some(value) => Some(KeyValue::from_attribute(attribute, value, MAX_SORT_KEY_SIZE)?),
            None => return Ok(None),
        },
        None => None,
    };
    Ok(Some((partition, sort)))
}

fn key_names(schema: &KeySchema) -> impl Iterator<Item = &str> {
    std::iter::once(schema.partition.name.as_str()).chain(schema.sort.iter().map(|a| a.name.as_str()))
}

/// A table mutation. The journal-backed substrate persists these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Mutation {
    CreateTable(TableDefinition),
    DeleteTable(String),
    Put { table: String, item: Item },
}

#[derive(Debug)]
struct Table {
    definition: TableDefinition,
    items: BTreeMap<PrimaryKey, Item>,
}

impl Table {
    fn primary_key(&self, item: &Item) -> Result<PrimaryKey, StorageError> {
        extract_key(&self.definition.key_schema, item)?.ok_or_else(|| {
            validation(format!(
                "item is missing a key attribute of table {}",
                self.definition.name
            ))
        })
    }

    fn validate_item(&self, item: &Item) -> Result<PrimaryKey, StorageError> {
        for (name, value) in item {
            if let AttributeValue::N(n) = value {
                if !is_decimal(n) {
                    return Err(validation(format!(
                        "attribute {} is not a number: {:?}",
                        name, n
                    )));
                }
            }
        }
        if item_size(item) > MAX_ITEM_SIZE {
            return Err(validation(format!(
                "item size exceeds the maximum of {} bytes",
                MAX_ITEM_SIZE
            )));
        }
        for index in &self.definition.global_indexes {
            extract_key(&index.key_schema, item)?;
        }
        self.primary_key(item)
    }

    fn index(&self, name: &str) -> Result<&IndexDefinition, StorageError> {
        self.definition
            .global_indexes
            .iter()
            .find(|index| index.name == name)
            .ok_or_else(|| {
                validation(format!(
                    "table {} has no index {}",
                    self.definition.name, name
                ))
            })
    }

    /// Projects the table key and, for index queries, the index key.
    fn key_item(&self, index: Option<&IndexDefinition>, item: &Item) -> Item {
        key_names(&self.definition.key_schema)
            .chain(index.into_iter().flat_map(|i| key_names(&i.key_schema)))
            .filter_map(|name| item.get(name).map(|v| (name.to_string(), v.clone())))
            .collect()
    }
}

/// Table state shared by the in-memory and journal-backed substrates.
///
/// Writes are planned against the current state first (`plan_*`), then
/// applied, so a caller can persist the mutation in between.
#[derive(Debug, Default)]
pub(crate) struct Database {
    tables: BTreeMap<String, Table>,
}

impl Database {
    fn table(&self, name: &str) -> Result<&Table, StorageError> {
        self.tables
            .get(name)
            .ok_or_else(|| StorageError::ResourceNotFound(format!("table {}", name)))
    }

    pub(crate) fn item_count(&self, table: &str) -> Result<usize, StorageError> {
        Ok(self.table(table)?.items.len())
    }

    pub(crate) fn plan_create_table(
        &self,
        definition: &TableDefinition,
    ) -> Result<Mutation, StorageError> {
        if definition.name.is_empty() {
            return Err(validation("table name must not be empty"));
        }
        if self.tables.contains_key(&definition.name) {
            return Err(StorageError::ResourceInUse(format!(
                "table {} already exists",
                definition.name
            )));
        }

        let mut index_names = BTreeSet::new();
        let mut attribute_types = BTreeMap::new();
        let schemas = std::iter::once(&definition.key_schema)
            .chain(definition.global_indexes.iter().map(|i| &i.key_schema));
        for schema in schemas {
            let attributes = std::iter::once(&schema.partition).chain(schema.sort.iter());
            for attribute in attributes {
                if attribute.name.is_empty() {
                    return Err(validation("key attribute names must not be empty"));
                }
                let declared = attribute_types
                    .entry(attribute.name.as_str())
                    .or_insert(attribute.attribute_type);
                if *declared != attribute.attribute_type {
                    return Err(validation(format!(
                        "conflicting types declared for attribute {}",
                        attribute.name
                    )));
                }
            }
        }
        for index in &definition.global_indexes {
            if !index_names.insert(index.name.as_str()) {
                return Err(validation(format!("duplicate index name {}", index.name)));
            }
        }

        Ok(Mutation::CreateTable(definition.clone()))
    }

    pub(crate) fn plan_delete_table(&self, table: &str) -> Result<Mutation, StorageError> {
        self.table(table)?;
        Ok(Mutation::DeleteTable(table.to_string()))
    }

    pub(crate) fn plan_put_if_absent(
        &self,
        table: &str,
        item: Item,
    ) -> Result<Mutation, StorageError> {
        let target = self.table(table)?;
        let key = target.validate_item(&item)?;
        if target.items.contains_key(&key) {
            return Err(StorageError::ConditionalCheckFailed {
                table: table.to_string(),
            });
        }
        Ok(Mutation::Put {
            table: table.to_string(),
            item,
        })
    }

    pub(crate) fn plan_add_counter(
        &self,
        table: &str,
        key: Item,
        attribute: &str,
        delta: i64,
    ) -> Result<(Mutation, AttributeValue), StorageError> {
        let target = self.table(table)?;
        let primary_key = target.primary_key(&key)?;
        if key.len() != key_names(&target.definition.key_schema).count() {
            return Err(validation("counter key must contain only key attributes"));
        }
        if key.contains_key(attribute) {
            return Err(validation(format!(
                "cannot update key attribute {}",
                attribute
            )));
        }

        let mut item = target.items.get(&primary_key).cloned().unwrap_or(key);
        let current = match item.get(attribute) {
            None => 0,
            Some(AttributeValue::N(n)) => n.parse::<i128>().map_err(|_| {
                validation(format!("attribute {} is not an integer: {:?}", attribute, n))
            })?,
            Some(AttributeValue::S(_)) => {
                return Err(validation(format!(
                    "attribute {} is not a number",
                    attribute
                )))
            }
        };
        let next = current
            .checked_add(i128::from(delta))
            .ok_or_else(|| validation(format!("attribute {} overflowed", attribute)))?;

        let value = AttributeValue::number(next);
        item.insert(attribute.to_string(), value.clone());
        Ok((
            Mutation::Put {
                table: table.to_string(),
                item,
            },
            value,
        ))
    }

    /// Applies a mutation produced by a `plan_*` call or read from a journal.
    pub(crate) fn apply(&mut self, mutation: Mutation) -> Result<(), StorageError> {
        match mutation {
            Mutation::CreateTable(definition) => {
                if self.tables.contains_key(&definition.name) {
                    return Err(StorageError::ResourceInUse(format!(
                        "table {} already exists",
                        definition.name
                    )));
                }
                self.tables.insert(
                    definition.name.clone(),
                    Table {
                        definition,
                        items: BTreeMap::new(),
                    },
                );
            }
            Mutation::DeleteTable(name) => {
                self.tables
                    .remove(&name)
                    .ok_or_else(|| StorageError::ResourceNotFound(format!("table {}", name)))?;
            }
            Mutation::Put { table, item } => {
                let target = self
                    .tables
                    .get_mut(&table)
                    .ok_or_else(|| StorageError::ResourceNotFound(format!("table {}", table)))?;
                let key = target.primary_key(&item)?;
                target.items.insert(key, item);
            }
        }
        Ok(())
    }

    pub(crate) fn query(&self, request: &QueryRequest) -> Result<QueryOutput, StorageError> {
        let table = self.table(&request.table)?;
        if request.limit == Some(0) {
            return Err(validation("limit must be at least 1"));
        }

        let index = match &request.index {
            Some(name) if request.consistent_read => {
                return Err(validation(format!(
                    "consistent reads are not supported on global index {}",
                    name
                )))
            }
            Some(name) => Some(table.index(name)?),
            None => None,
        };
        let schema = index.map_or(&table.definition.key_schema, |i| &i.key_schema);

        let partition = KeyValue::from_attribute(
            &schema.partition,
            &request.partition_value,
            MAX_PARTITION_KEY_SIZE,
        )?;

        let bound = match &request.range {
            None => None,
            Some(range) => {
                let attribute = schema
                    .sort
                    .as_ref()
                    .ok_or_else(|| validation("range condition requires a sort key"))?;
                Some(match range {
                    RangeBound::AtLeast(v) => {
                        (true, KeyValue::from_attribute(attribute, v, MAX_SORT_KEY_SIZE)?)
                    }
                    RangeBound::GreaterThan(v) => {
                        (false, KeyValue::from_attribute(attribute, v, MAX_SORT_KEY_SIZE)?)
                    }
                })
            }
        };

        let start = match &request.exclusive_start_key {
            None => None,
            Some(key) => {
                let invalid = || validation("exclusive start key is invalid");
                let (_, sort) = extract_key(schema, key)?.ok_or_else(invalid)?;
                let primary_key = extract_key(&table.definition.key_schema, key)?
                    .ok_or_else(invalid)?;
                Some((sort, primary_key))
            }
        };

        let mut rows = Vec::new();
        for (primary_key, item) in &table.items {
            let Some((p, sort)) = extract_key(schema, item)? else {
                continue;
            };
            if p != partition {
                continue;
            }
            let in_range = match (&bound, &sort) {
                (None, _) => true,
                (Some((true, b)), Some(s)) => s >= b,
                (Some((false, b)), Some(s)) => s > b,
                (Some(_), None) => false,
            };
            let after_start = match &start {
                None => true,
                Some((start_sort, start_key)) => (&sort, primary_key) > (start_sort, start_key),
            };
            if in_range && after_start {
                rows.push((sort, primary_key, item));
            }
        }
        rows.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

        let limit = request.limit.unwrap_or(usize::MAX);
        let mut output = QueryOutput::default();
        for (_, _, item) in rows {
            if output.items.len() == limit {
                output.last_evaluated_key =
                    output.items.last().map(|last| table.key_item(index, last));
                break;
            }
            output.items.push(item.clone());
        }
        Ok(output)
    }
}

/// Volatile storage substrate. Tables live for the life of the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    database: RwLock<Database>,
}

impl MemoryStorage {
    /// Creates an empty substrate with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently stored in `table`.
    pub fn item_count(&self, table: &str) -> Result<usize, StorageError> {
        self.database.read().item_count(table)
    }
}

impl StorageClient for MemoryStorage {
    fn create_table(&self, definition: &TableDefinition) -> Result<(), StorageError> {
        let mut database = self.database.write();
        let mutation = database.plan_create_table(definition)?;
        database.apply(mutation)
    }

    fn delete_table(&self, table: &str) -> Result<(), StorageError> {
        let mut database = self.database.write();
        let mutation = database.plan_delete_table(table)?;
        database.apply(mutation)
    }

    fn add_counter(
        &self,
        table: &str,
        key: Item,
        attribute: &str,
        delta: i64,
    ) -> Result<AttributeValue, StorageError> {
        let mut database = self.database.write();
        let (mutation, value) = database.plan_add_counter(table, key, attribute, delta)?;
        database.apply(mutation)?;
        Ok(value)
    }

    fn put_if_absent(&self, table: &str, item: Item) -> Result<(), StorageError> {
        let mut database = self.database.write();
        let mutation = database.plan_put_if_absent(table, item)?;
        database.apply(mutation)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryOutput, StorageError> {
        self.database.read().query(request)
    }
}

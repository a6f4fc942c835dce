//! Durable storage substrate backed by a commitstore journal.
//!
//! Every mutation is planned against the in-memory tables, appended to the
//! journal, then applied. Opening the substrate replays the journal, so the
//! tables survive restarts. Counter increments are journalled as the full
//! counter row, which keeps replay a plain sequence of puts.

use crate::attribute::{AttributeValue, Item};
use crate::error::StorageError;
use crate::memory::{Database, Mutation};
use crate::substrate::{QueryOutput, QueryRequest, StorageClient, TableDefinition};
use commitstore_journal::{JournalReader, JournalWriter, ReadMode, WriteOptions};
use parking_lot::RwLock;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Options for [`JournalStorage::open`].
#[derive(Debug, Clone)]
pub struct JournalOptions {
    /// How a damaged journal tail is treated on replay.
    pub mode: ReadMode,
    /// Whether to fsync after each mutation.
    pub sync: bool,
}

impl Default for JournalOptions {
    fn default() -> Self {
        Self {
            mode: ReadMode::Strict,
            sync: false,
        }
    }
}

struct Inner {
    database: Database,
    writer: JournalWriter,
}

/// Journal-backed storage substrate.
///
/// One process should own a journal file at a time; the substrate does not
/// lock the file.
pub struct JournalStorage {
    path: PathBuf,
    inner: RwLock<Inner>,
}

impl JournalStorage {
    /// Opens or creates the journal at `path` and replays it.
    ///
    /// In [`ReadMode::Permissive`] a truncated or corrupt tail is cut off
    /// before new frames are appended. In [`ReadMode::Strict`] it is an
    /// error.
    pub fn open<P: AsRef<Path>>(path: P, options: JournalOptions) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut database = Database::default();

        let exists = path.exists() && std::fs::metadata(&path)?.len() > 0;
        if exists {
            let mut reader = JournalReader::open(&path, options.mode)?;
            let mut mutations = 0usize;
            while let Some(mutation) = reader.read_record::<Mutation>()? {
                database.apply(mutation)?;
                mutations += 1;
            }

            let valid = reader.position();
            let len = std::fs::metadata(&path)?.len();
            if valid < len {
                warn!(
                    path = %path.display(),
                    valid_bytes = valid,
                    dropped_bytes = len - valid,
                    "truncating damaged journal tail"
                );
                OpenOptions::new().write(true).open(&path)?.set_len(valid)?;
            }
            info!(path = %path.display(), mutations, "replayed journal");
        }

        let writer = JournalWriter::open(
            &path,
            WriteOptions {
                sync: options.sync,
                create: true,
            },
        )?;

        Ok(Self {
            path,
            inner: RwLock::new(Inner { database, writer }),
        })
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of items currently stored in `table`.
    pub fn item_count(&self, table: &str) -> Result<usize, StorageError> {
        self.inner.read().database.item_count(table)
    }
}

impl Inner {
    fn commit(&mut self, mutation: Mutation) -> Result<(), StorageError> {
        self.writer.append_record(&mutation)?;
        self.database.apply(mutation)
    }
}

impl StorageClient for JournalStorage {
    fn create_table(&self, definition: &TableDefinition) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        let mutation = inner.database.plan_create_table(definition)?;
        inner.commit(mutation)
    }

    fn delete_table(&self, table: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        let mutation = inner.database.plan_delete_table(table)?;
        inner.commit(mutation)
    }

    fn add_counter(
        &self,
        table: &str,
        key: Item,
        attribute: &str,
        delta: i64,
    ) -> Result<AttributeValue, StorageError> {
        let mut inner = self.inner.write();
        let (mutation, value) = inner.database.plan_add_counter(table, key, attribute, delta)?;
        inner.commit(mutation)?;
        Ok(value)
    }

    fn put_if_absent(&self, table: &str, item: Item) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        let mutation = inner.database.plan_put_if_absent(table, item)?;
        inner.commit(mutation)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryOutput, StorageError> {
        self.inner.read().database.query(request)
    }
}

//! Subcommand implementations and the store they share.

pub mod append;
pub mod query;
pub mod scan;
pub mod schema;

use commitstore_store::{
    CommitStore, ConfigError, JournalOptions, JournalStorage, ReadMode, SequenceStrategy,
    StoreConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised by the CLI itself, before the store is involved.
#[derive(Error, Debug)]
pub enum CliError {
    /// The configuration file could not be loaded.
    #[error("failed to load config {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },
    /// Input could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The events input is not a JSON array.
    #[error("invalid events: {0}")]
    InvalidEvents(String),
}

/// Options selecting and opening the store.
pub struct StoreArgs {
    pub journal: PathBuf,
    pub config: Option<PathBuf>,
    pub derived: bool,
    pub permissive: bool,
}

impl StoreArgs {
    fn config(&self) -> Result<StoreConfig, CliError> {
        let config = match &self.config {
            Some(path) => StoreConfig::load(path).map_err(|source| CliError::Config {
                path: path.display().to_string(),
                source,
            })?,
            None => StoreConfig::default(),
        };
        Ok(if self.derived {
            config.with_sequence(SequenceStrategy::Derived)
        } else {
            config
        })
    }

    /// Loads the configuration and opens the journal-backed store.
    pub fn open(&self) -> Result<CommitStore<JournalStorage>, Box<dyn std::error::Error>> {
        let config = self.config()?;
        let mode = if self.permissive {
            ReadMode::Permissive
        } else {
            ReadMode::Strict
        };
        debug!(
            journal = %self.journal.display(),
            sequence = %config.sequence,
            "opening store"
        );
        let storage = JournalStorage::open(&self.journal, JournalOptions { mode, sync: false })
            .map_err(|e| format!("failed to open journal {}: {}", self.journal.display(), e))?;
        Ok(CommitStore::new(Arc::new(storage), config))
    }
}

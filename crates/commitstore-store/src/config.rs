//! Store configuration.

use crate::sequence::{SequenceStrategy, Sequencer};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors loading a [`StoreConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Table names and sequencing choice for a store.
///
/// Every field has a default, so an empty TOML document is a valid config:
///
/// ```toml
/// commit_table = "commits"
/// commit_index = "byCommitId"
/// counter_table = "counters"
/// counter_name = "commits"
/// sequence = "counter"   # or "derived"
/// page_size = 100        # optional
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Commit table name.
    pub commit_table: String,
    /// Global ordering index on the commit table.
    pub commit_index: String,
    /// Counter table name; used only by the counter strategy.
    pub counter_table: String,
    /// Row in the counter table holding the commit sequence.
    pub counter_name: String,
    /// Commit id strategy.
    pub sequence: SequenceStrategy,
    /// Items per substrate request when reading; unlimited when absent.
    pub page_size: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            commit_table: "commits".to_string(),
            commit_index: "byCommitId".to_string(),
            counter_table: "counters".to_string(),
            counter_name: "commits".to_string(),
            sequence: SequenceStrategy::Counter,
            page_size: None,
        }
    }
}

impl StoreConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Returns a copy using `sequence`.
    pub fn with_sequence(mut self, sequence: SequenceStrategy) -> Self {
        self.sequence = sequence;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("commit_table", &self.commit_table),
            ("commit_index", &self.commit_index),
            ("counter_table", &self.counter_table),
            ("counter_name", &self.counter_name),
        ];
        for (field, value) in names {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
        }
        if self.page_size == Some(0) {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Builds the sequencer for the configured strategy.
    pub fn sequencer(&self) -> Sequencer {
        match self.sequence {
            SequenceStrategy::Counter => Sequencer::Counter {
                table: self.counter_table.clone(),
                name: self.counter_name.clone(),
            },
            SequenceStrategy::Derived => Sequencer::Derived,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(StoreConfig::from_toml_str("").unwrap(), StoreConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let config = StoreConfig::from_toml_str(
            r#"
            commit_table = "c"
            commit_index = "i"
            counter_table = "k"
            counter_name = "seq"
            sequence = "derived"
            page_size = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.commit_table, "c");
        assert_eq!(config.commit_index, "i");
        assert_eq!(config.counter_table, "k");
        assert_eq!(config.counter_name, "seq");
        assert_eq!(config.sequence, SequenceStrategy::Derived);
        assert_eq!(config.page_size, Some(25));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        assert!(matches!(
            StoreConfig::from_toml_str("table = \"x\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str("sequence = \"uuid\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str("commit_table = \"\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str("page_size = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn sequencer_follows_strategy() {
        let config = StoreConfig::default();
        assert!(matches!(
            config.sequencer(),
            Sequencer::Counter { ref table, ref name } if table == "counters" && name == "commits"
        ));
        let derived = config.with_sequence(SequenceStrategy::Derived);
        assert!(matches!(derived.sequencer(), Sequencer::Derived));
    }
}

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of the aggregate a commit belongs to.
///
/// The store never interprets the value beyond requiring it to be non-empty;
/// any further length limits are enforced by the storage substrate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AggregateId(String);

impl AggregateId {
    /// Parses an aggregate identifier, rejecting the empty string.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty {
                field: "aggregate_id",
            });
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AggregateId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AggregateId> for String {
    fn from(value: AggregateId) -> Self {
        value.0
    }
}

impl AsRef<str> for AggregateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert_eq!(
            AggregateId::parse(""),
            Err(ValidationError::Empty {
                field: "aggregate_id"
            })
        );
    }

    #[test]
    fn deserialize_validates() {
        let parsed: Result<AggregateId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let parsed: AggregateId = serde_json::from_str("\"order-7\"").unwrap();
        assert_eq!(parsed.as_str(), "order-7");
    }
}

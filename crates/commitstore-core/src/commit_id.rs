use crate::identifiers::AggregateId;
use crate::validation::ValidationError;
use chrono::{DateTime, Datelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the calendar-compact timestamp prefix of a derived commit id
/// (`YYYYMMDDHHMMSSmmm`).
pub const DERIVED_TIMESTAMP_WIDTH: usize = 17;

/// Separates the timestamp from the aggregate id in a derived commit id.
pub const DERIVED_SEPARATOR: char = ':';

const DERIVED_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Store-assigned global ordering key of a commit.
///
/// A store produces only one variant, chosen by its sequence strategy:
/// counter-backed stores issue [`CommitId::Sequence`], derived-key stores
/// issue [`CommitId::Derived`]. Ordering between the two variants is defined
/// only so the type is totally ordered; it carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommitId {
    /// Post-increment value of the shared commit counter.
    Sequence(u64),
    /// Fixed-width UTC timestamp, `:`, then the aggregate id.
    Derived(String),
}

impl CommitId {
    /// Builds a derived commit id from a clock reading and the aggregate id.
    ///
    /// The timestamp is rendered as a zero-padded `YYYYMMDDHHMMSSmmm` string so
    /// that lexical order equals chronological order, and is followed by
    /// [`DERIVED_SEPARATOR`] and the aggregate id.
    ///
    /// Two commits of one aggregate stamped in the same millisecond share an
    /// id, so derived ids are not unique. Commits of different aggregates
    /// stamped in the same millisecond are ordered by aggregate id, which is
    /// arbitrary with respect to the order they were appended in.
    pub fn derived(millis: u64, aggregate_id: &AggregateId) -> Result<Self, ValidationError> {
        let out_of_range = || ValidationError::OutOfRange {
            field: "clock",
            value: millis.to_string(),
        };
        let signed = i64::try_from(millis).map_err(|_| out_of_range())?;
        let at = DateTime::from_timestamp_millis(signed).ok_or_else(out_of_range)?;
        if at.year() > 9999 {
            return Err(out_of_range());
        }

        let mut id = at.format(DERIVED_TIMESTAMP_FORMAT).to_string();
        id.push(DERIVED_SEPARATOR);
        id.push_str(aggregate_id.as_str());
        Ok(CommitId::Derived(id))
    }

    /// Returns the timestamp prefix of a derived id, if this is one.
    pub fn timestamp_prefix(&self) -> Option<&str> {
        match self {
            CommitId::Derived(id) => id.get(..DERIVED_TIMESTAMP_WIDTH),
            CommitId::Sequence(_) => None,
        }
    }

    /// Returns the aggregate id part of a derived id, if this is one.
    ///
    /// The timestamp is fixed width, so the split is unambiguous even when
    /// the aggregate id itself contains the separator.
    pub fn aggregate_part(&self) -> Option<&str> {
        match self {
            CommitId::Derived(id) => id
                .get(DERIVED_TIMESTAMP_WIDTH..)?
                .strip_prefix(DERIVED_SEPARATOR),
            CommitId::Sequence(_) => None,
        }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitId::Sequence(n) => write!(f, "{}", n),
            CommitId::Derived(id) => f.write_str(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(id: &str) -> AggregateId {
        AggregateId::parse(id).unwrap()
    }

    #[test]
    fn derived_epoch_is_zero_padded() {
        let id = CommitId::derived(0, &aggregate("a")).unwrap();
        assert_eq!(id, CommitId::Derived("19700101000000000:a".to_string()));
        assert_eq!(id.timestamp_prefix(), Some("19700101000000000"));
        assert_eq!(id.aggregate_part(), Some("a"));
    }

    #[test]
    fn derived_keeps_milliseconds() {
        // 2024-01-02T03:04:05.067Z
        let id = CommitId::derived(1_704_164_645_067, &aggregate("x")).unwrap();
        assert_eq!(id.to_string(), "20240102030405067:x");
    }

    #[test]
    fn aggregate_part_splits_on_fixed_width() {
        let id = CommitId::derived(0, &aggregate("tenant:order:7")).unwrap();
        assert_eq!(id.to_string(), "19700101000000000:tenant:order:7");
        assert_eq!(id.aggregate_part(), Some("tenant:order:7"));
        assert_eq!(CommitId::Sequence(4).aggregate_part(), None);
        assert_eq!(CommitId::Derived("0".to_string()).aggregate_part(), None);
    }

    #[test]
    fn same_millisecond_same_aggregate_collide() {
        let first = CommitId::derived(5, &aggregate("a")).unwrap();
        let second = CommitId::derived(5, &aggregate("a")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn derived_order_follows_time_then_aggregate() {
        let earlier = CommitId::derived(999, &aggregate("zzz")).unwrap();
        let later = CommitId::derived(1_000, &aggregate("aaa")).unwrap();
        assert!(earlier < later);

        let tie_a = CommitId::derived(1_000, &aggregate("a")).unwrap();
        let tie_b = CommitId::derived(1_000, &aggregate("b")).unwrap();
        assert!(tie_a < tie_b);

        // The separator sorts after every digit, so a bare timestamp prefix
        // is a lower bound for all ids stamped at that millisecond.
        assert!(tie_a.timestamp_prefix().unwrap() < tie_a.to_string().as_str());
    }

    #[test]
    fn derived_rejects_years_past_9999() {
        assert!(CommitId::derived(u64::MAX, &aggregate("a")).is_err());
        assert!(CommitId::derived(253_402_300_800_000, &aggregate("a")).is_err());
        assert!(CommitId::derived(253_402_300_799_999, &aggregate("a")).is_ok());
    }

    #[test]
    fn serializes_untagged() {
        assert_eq!(serde_json::to_string(&CommitId::Sequence(3)).unwrap(), "3");
        let derived: CommitId = serde_json::from_str("\"19700101000000000:a\"").unwrap();
        assert!(matches!(derived, CommitId::Derived(_)));
    }
}

//! Commit data model for the commitstore event log.
//!
//! This crate provides:
//! - [`Commit`] and [`CommittedRecord`], the unit appended to and read from the log
//! - [`AggregateId`] and [`CommitId`] identifiers
//! - The [`Clock`] abstraction used to stamp commits
//!
//! Core invariants:
//! - A commit is immutable once written; nothing in this workspace updates or deletes one
//! - At most one commit exists per (`aggregate_id`, `version`)
//! - `commit_id` order matches append order for commits from one writer instance
//!
#![deny(missing_docs)]

/// Clock abstraction used to stamp commits.
pub mod clock;
/// Commit value objects.
pub mod commit;
/// Store-assigned global ordering keys.
pub mod commit_id;
/// Aggregate identity newtype.
pub mod identifiers;
/// Validation errors for core primitives.
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use commit::{Commit, CommittedRecord};
pub use commit_id::{CommitId, DERIVED_SEPARATOR, DERIVED_TIMESTAMP_WIDTH};
pub use identifiers::AggregateId;
pub use validation::ValidationError;

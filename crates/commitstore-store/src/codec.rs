//! Conversion between [`CommittedRecord`] and stored items.
//!
//! | attribute     | type | content                                   |
//! |---------------|------|-------------------------------------------|
//! | `aggregateId` | S    | aggregate id (table partition key)        |
//! | `version`     | N    | version (table sort key)                  |
//! | `commitId`    | N/S  | counter value or derived key (index sort) |
//! | `committedAt` | N    | epoch milliseconds                        |
//! | `events`      | S    | JSON array of events                      |
//! | `active`      | S    | constant [`ACTIVE_MARKER`] (index partition) |

use crate::attribute::{AttributeType, AttributeValue, Item};
use crate::error::{DecodeError, StoreError};
use commitstore_core::{AggregateId, CommitId, CommittedRecord};
use serde_json::Value;

/// Table partition key.
pub const AGGREGATE_ID: &str = "aggregateId";
/// Table sort key.
pub const VERSION: &str = "version";
/// Global index sort key.
pub const COMMIT_ID: &str = "commitId";
/// Append timestamp.
pub const COMMITTED_AT: &str = "committedAt";
/// Serialized events.
pub const EVENTS: &str = "events";
/// Global index partition key.
pub const ACTIVE: &str = "active";

/// Deepest array/object nesting accepted inside a single event.
///
/// The stored blob wraps events in one more array, and the decoder refuses
/// documents nested past 128 levels, so anything deeper could be written but
/// never read back.
pub const MAX_EVENT_DEPTH: usize = 100;

/// The single value of the global index partition key. Every commit carries
/// it, so the whole log forms one range-ordered index partition.
pub const ACTIVE_MARKER: &str = "t";

/// Converts a commit id to its stored attribute.
pub fn commit_id_attribute(commit_id: &CommitId) -> AttributeValue {
    match commit_id {
        CommitId::Sequence(n) => AttributeValue::number(n),
        CommitId::Derived(key) => AttributeValue::string(key.clone()),
    }
}

/// Rejects events the codec could store but not decode again.
///
/// # Errors
///
/// Returns [`StoreError::Validation`] naming the first event nested deeper
/// than [`MAX_EVENT_DEPTH`].
pub fn validate_events(events: &[Value]) -> Result<(), StoreError> {
    for (index, event) in events.iter().enumerate() {
        let depth = nesting_depth(event);
        if depth > MAX_EVENT_DEPTH {
            return Err(StoreError::Validation(format!(
                "event {} is nested {} levels deep; at most {} are allowed",
                index, depth, MAX_EVENT_DEPTH
            )));
        }
    }
    Ok(())
}

/// Array/object nesting of `value`; scalars are 0. Iterative so that hostile
/// input cannot exhaust the stack.
fn nesting_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 0usize)];
    while let Some((value, depth)) = pending.pop() {
        let depth = depth + 1;
        match value {
            Value::Array(values) => pending.extend(values.iter().map(|v| (v, depth))),
            Value::Object(map) => pending.extend(map.values().map(|v| (v, depth))),
            _ => continue,
        }
        deepest = deepest.max(depth);
    }
    deepest
}

/// Encodes a record as a stored item.
///
/// # Errors
///
/// Returns [`StoreError::Validation`] if the events are nested too deeply or
/// cannot be serialized.
pub fn encode(record: &CommittedRecord) -> Result<Item, StoreError> {
    validate_events(&record.events)?;
    let events = serde_json::to_string(&record.events)
        .map_err(|e| StoreError::Validation(format!("events are not serializable: {}", e)))?;

    let mut item = Item::new();
    item.insert(
        AGGREGATE_ID.to_string(),
        AttributeValue::string(record.aggregate_id.as_str()),
    );
    item.insert(VERSION.to_string(), AttributeValue::number(record.version));
    item.insert(COMMIT_ID.to_string(), commit_id_attribute(&record.commit_id));
    item.insert(
        COMMITTED_AT.to_string(),
        AttributeValue::number(record.committed_at),
    );
    item.insert(EVENTS.to_string(), AttributeValue::S(events));
    item.insert(ACTIVE.to_string(), AttributeValue::string(ACTIVE_MARKER));
    Ok(item)
}

/// Decodes a stored item back into a record.
///
/// Unknown attributes are ignored; `active` is not required.
pub fn decode(item: &Item) -> Result<CommittedRecord, DecodeError> {
    let aggregate_id = AggregateId::parse(string(item, AGGREGATE_ID)?)
        .map_err(|e| DecodeError::InvalidAggregateId(e.to_string()))?;
    let version = integer(item, VERSION)?;
    let committed_at = integer(item, COMMITTED_AT)?;

    let commit_id = match attribute(item, COMMIT_ID)? {
        AttributeValue::N(n) => CommitId::Sequence(parse_integer(COMMIT_ID, n)?),
        AttributeValue::S(key) => CommitId::Derived(key.clone()),
    };

    let events = match serde_json::from_str::<Value>(string(item, EVENTS)?) {
        Ok(Value::Array(events)) => events,
        Ok(other) => {
            return Err(DecodeError::InvalidEvents(format!(
                "expected a JSON array, found {}",
                json_kind(&other)
            )))
        }
        Err(e) => return Err(DecodeError::InvalidEvents(e.to_string())),
    };

    Ok(CommittedRecord {
        commit_id,
        committed_at,
        aggregate_id,
        version,
        events,
    })
}

fn attribute<'a>(item: &'a Item, name: &'static str) -> Result<&'a AttributeValue, DecodeError> {
    item.get(name).ok_or(DecodeError::MissingAttribute(name))
}

fn string<'a>(item: &'a Item, name: &'static str) -> Result<&'a str, DecodeError> {
    let value = attribute(item, name)?;
    value.as_string().ok_or(DecodeError::WrongType {
        name,
        expected: AttributeType::S,
        found: value.attribute_type(),
    })
}

fn integer(item: &Item, name: &'static str) -> Result<u64, DecodeError> {
    let value = attribute(item, name)?;
    let text = value.as_number().ok_or(DecodeError::WrongType {
        name,
        expected: AttributeType::N,
        found: value.attribute_type(),
    })?;
    parse_integer(name, text)
}

fn parse_integer(name: &'static str, text: &str) -> Result<u64, DecodeError> {
    // u64::from_str accepts a leading '+'; stored numbers never carry one.
    if text.starts_with('+') {
        return Err(DecodeError::InvalidNumber {
            name,
            value: text.to_string(),
        });
    }
    text.parse().map_err(|_| DecodeError::InvalidNumber {
        name,
        value: text.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

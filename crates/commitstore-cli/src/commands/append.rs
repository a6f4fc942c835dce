//! Append command implementation.

use super::{CliError, StoreArgs};
use crate::output;
use commitstore_core::{AggregateId, Commit};
use serde_json::Value;
use std::io::{self, Read};
use std::path::PathBuf;

pub fn run(
    args: &StoreArgs,
    aggregate: String,
    version: u64,
    events: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let aggregate_id = AggregateId::parse(aggregate)?;

    // Read events from file or stdin
    let text = match events {
        Some(path) => std::fs::read_to_string(&path).map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|source| CliError::Read {
                    path: "stdin".to_string(),
                    source,
                })?;
            buffer
        }
    };
    let events = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(events)) => events,
        Ok(_) => return Err(CliError::InvalidEvents("expected a JSON array".to_string()).into()),
        Err(e) => return Err(CliError::InvalidEvents(e.to_string()).into()),
    };

    let store = args.open()?;
    let record = store.append(Commit::new(aggregate_id, version, events))?;

    if json {
        println!("{}", output::format_json(&record)?);
    } else {
        println!("Appended commit {}", record.commit_id);
    }
    Ok(())
}

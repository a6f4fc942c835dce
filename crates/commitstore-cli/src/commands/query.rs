//! Query command implementation.

use super::StoreArgs;
use crate::output;
use commitstore_core::AggregateId;

pub fn run(
    args: &StoreArgs,
    aggregate: String,
    from_version: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let aggregate_id = AggregateId::parse(aggregate)?;
    let store = args.open()?;
    let commits = store.query(&aggregate_id, from_version)?;

    if !json {
        output::print_table_header();
    }
    for record in &commits {
        if json {
            println!("{}", output::format_json(record)?);
        } else {
            println!("{}", output::format_table_row(record));
        }
    }
    Ok(())
}

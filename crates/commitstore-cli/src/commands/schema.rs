//! Init and drop command implementations.

use super::StoreArgs;

pub fn init(args: &StoreArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = args.open()?;
    store.create_schema()?;
    println!(
        "Created table {} (sequence: {})",
        store.config().commit_table,
        store.strategy()
    );
    Ok(())
}

pub fn drop(args: &StoreArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = args.open()?;
    store.drop_schema()?;
    println!("Dropped table {}", store.config().commit_table);
    Ok(())
}

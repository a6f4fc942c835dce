//! commitstore CLI - append to and read from a journal-backed commit store.

use clap::{Parser, Subcommand};
use commitstore_store::StoreError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod cursor;
mod output;

use commands::{append, query, scan, schema, StoreArgs};

/// Exit code for a version conflict; retry after re-reading the aggregate.
const EXIT_CONFLICT: i32 = 2;

#[derive(Parser)]
#[command(name = "commitstore")]
#[command(about = "Append-only event commit store")]
struct Cli {
    /// Path to the store journal
    #[arg(long, global = true, default_value = "commitstore.csj")]
    journal: PathBuf,
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Use derived (timestamp + aggregate) commit ids instead of the counter
    #[arg(long, global = true)]
    derived: bool,
    /// Drop a damaged journal tail instead of failing
    #[arg(long, global = true)]
    permissive: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the commit table, its index and (counter strategy) the counter table
    Init,
    /// Delete every table the store uses, with all commits
    Drop,
    /// Append a commit; events are a JSON array read from FILE or stdin
    Append {
        /// Aggregate id
        #[arg(long)]
        aggregate: String,
        /// Version of this commit within the aggregate
        #[arg(long)]
        version: u64,
        /// JSON file holding the events array (default: stdin)
        events: Option<PathBuf>,
        /// Output the stored commit as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the commits of one aggregate in version order
    Query {
        /// Aggregate id
        aggregate: String,
        /// Smallest version to return
        #[arg(long, default_value_t = 0)]
        from_version: u64,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// List commits of all aggregates in commit id order
    Scan {
        /// Smallest commit id to return
        #[arg(long, conflicts_with = "after")]
        from: Option<String>,
        /// Resume token printed by a previous `scan --limit`
        #[arg(long, value_name = "TOKEN")]
        after: Option<String>,
        /// Return at most N commits and report where to resume
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let store = StoreArgs {
        journal: cli.journal,
        config: cli.config,
        derived: cli.derived,
        permissive: cli.permissive,
    };

    let result = match cli.command {
        Commands::Init => schema::init(&store),
        Commands::Drop => schema::drop(&store),
        Commands::Append {
            aggregate,
            version,
            events,
            json,
        } => append::run(&store, aggregate, version, events, json),
        Commands::Query {
            aggregate,
            from_version,
            json,
        } => query::run(&store, aggregate, from_version, json),
        Commands::Scan {
            from,
            after,
            limit,
            json,
        } => scan::run(&store, from, after, limit, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let conflict = e
            .downcast_ref::<StoreError>()
            .is_some_and(StoreError::is_conflict);
        std::process::exit(if conflict { EXIT_CONFLICT } else { 1 });
    }
}

//! Scan command implementation.

use super::StoreArgs;
use crate::{cursor, output};
use commitstore_store::ScanPosition;

/// Page size used to drain the feed when `--after` is given without `--limit`.
const DRAIN_PAGE: usize = 1000;

pub fn run(
    args: &StoreArgs,
    from: Option<String>,
    after: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = args.open()?;
    let strategy = store.strategy();

    let position = match (from, after) {
        (Some(id), _) => ScanPosition::From(strategy.parse_commit_id(&id)?),
        (None, Some(token)) => ScanPosition::After(cursor::decode(&token, strategy)?),
        (None, None) => ScanPosition::Start,
    };

    let (commits, next) = match (limit, position) {
        (Some(limit), position) => {
            let page = store.scan_page(&position, limit)?;
            (page.commits, page.next)
        }
        (None, ScanPosition::Start) => (store.scan(None)?, None),
        (None, ScanPosition::From(id)) => (store.scan(Some(&id))?, None),
        (None, position) => {
            let mut commits = Vec::new();
            let mut position = position;
            loop {
                let page = store.scan_page(&position, DRAIN_PAGE)?;
                commits.extend(page.commits);
                match page.next {
                    Some(next) => position = next,
                    None => break,
                }
            }
            (commits, None)
        }
    };

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
    if let Some(ScanPosition::After(next)) = next {
        eprintln!(
            "More commits available; resume with --after {}",
            cursor::encode(&next)?
        );
    }
    Ok(())
}

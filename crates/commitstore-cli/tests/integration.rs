//! Integration tests for CLI commands.

use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

struct Env {
    dir: TempDir,
    journal: PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let journal = dir.path().join("store.csj");
        Self { dir, journal }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        self.run_with_stdin(args, None)
    }

    fn run_with_stdin(&self, args: &[&str], stdin: Option<&str>) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_commitstore"))
            .arg("--journal")
            .arg(&self.journal)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to execute CLI");
        {
            let mut pipe = child.stdin.take().unwrap();
            if let Some(input) = stdin {
                pipe.write_all(input.as_bytes()).unwrap();
            }
        }
        child.wait_with_output().unwrap()
    }

    /// Runs `append`; `extra` goes after the subcommand.
    fn append(&self, extra: &[&str], aggregate: &str, version: u64, events: &Path) -> Output {
        let version = version.to_string();
        let mut args = vec![
            "append",
            "--aggregate",
            aggregate,
            "--version",
            version.as_str(),
            events.to_str().unwrap(),
        ];
        args.extend_from_slice(extra);
        self.run(&args)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}

/// The token from the "resume with --after <TOKEN>" hint, if one was printed.
fn resume_token(output: &Output) -> Option<String> {
    stderr(output)
        .lines()
        .find(|l| l.contains("resume with --after"))
        .and_then(|l| l.split_whitespace().last())
        .map(str::to_string)
}

fn json_lines(output: &Output) -> Vec<Value> {
    stdout(output)
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).expect("Invalid JSON"))
        .collect()
}

#[test]
fn test_append_query_scan() {
    let env = Env::new();
    let events = env.write("events.json", r#"[{"type": "Created"}, {"type": "Renamed"}]"#);

    let init = env.run(&["init"]);
    assert!(init.status.success(), "{}", stderr(&init));
    assert!(stdout(&init).contains("sequence: counter"));

    let first = env.append(&[], "order-1", 0, &events);
    assert!(first.status.success(), "{}", stderr(&first));
    assert!(stdout(&first).contains("Appended commit 1"));
    assert!(env.append(&[], "order-1", 1, &events).status.success());
    assert!(env.append(&[], "order-2", 0, &events).status.success());

    let table = env.run(&["query", "order-1"]);
    assert!(table.status.success());
    let text = stdout(&table);
    assert!(text.contains("COMMIT_ID"));
    assert!(text.contains("order-1"));
    assert!(!text.contains("order-2"));

    let query = env.run(&["query", "order-1", "--from-version", "1", "--json"]);
    let records = json_lines(&query);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["version"], 1);
    assert_eq!(records[0]["commitId"], 2);
    assert_eq!(records[0]["events"][1]["type"], "Renamed");

    let scan = env.run(&["scan", "--json"]);
    let ids: Vec<_> = json_lines(&scan)
        .iter()
        .map(|r| r["commitId"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let from = env.run(&["scan", "--from", "2", "--json"]);
    assert_eq!(json_lines(&from).len(), 2);
    let page = env.run(&["scan", "--limit", "2", "--json"]);
    let token = resume_token(&page).unwrap();
    let after = env.run(&["scan", "--after", &token, "--json"]);
    let rest = json_lines(&after);
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["aggregateId"], "order-2");
}

#[test]
fn test_conflict_exits_with_code_2() {
    let env = Env::new();
    let events = env.write("events.json", "[1]");
    assert!(env.run(&["init"]).status.success());
    assert!(env.append(&[], "a", 0, &events).status.success());

    let conflict = env.append(&[], "a", 0, &events);
    assert_eq!(conflict.status.code(), Some(2));
    assert!(stderr(&conflict).contains("version conflict"));

    let query = env.run(&["query", "a", "--json"]);
    assert_eq!(json_lines(&query).len(), 1);
}

#[test]
fn test_append_reads_events_from_stdin() {
    let env = Env::new();
    assert!(env.run(&["init"]).status.success());

    let output = env.run_with_stdin(
        &["append", "--aggregate", "a", "--version", "0", "--json"],
        Some(r#"[{"from": "stdin"}]"#),
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let record = &json_lines(&output)[0];
    assert_eq!(record["events"][0]["from"], "stdin");
}

#[test]
fn test_invalid_input_exits_with_code_1() {
    let env = Env::new();
    assert!(env.run(&["init"]).status.success());

    let object = env.write("object.json", r#"{"not": "an array"}"#);
    let output = env.append(&[], "a", 0, &object);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: invalid events"));

    let broken = env.write("broken.json", "[");
    assert_eq!(env.append(&[], "a", 0, &broken).status.code(), Some(1));

    let events = env.write("events.json", "[]");
    let empty = env.append(&[], "", 0, &events);
    assert_eq!(empty.status.code(), Some(1));

    let bad_id = env.run(&["scan", "--from", "abc"]);
    assert_eq!(bad_id.status.code(), Some(1));
}

#[test]
fn test_missing_schema_is_an_error() {
    let env = Env::new();
    let output = env.run(&["query", "a"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("resource not found"));
}

#[test]
fn test_init_twice_fails_and_drop_recreates() {
    let env = Env::new();
    assert!(env.run(&["init"]).status.success());
    let again = env.run(&["init"]);
    assert_eq!(again.status.code(), Some(1));
    assert!(stderr(&again).contains("already exists"));

    assert!(env.run(&["drop"]).status.success());
    assert!(env.run(&["init"]).status.success());
}

#[test]
fn test_derived_ids() {
    let env = Env::new();
    let events = env.write("events.json", "[]");
    assert!(env.run(&["--derived", "init"]).status.success());

    // Global flags are accepted after the subcommand too.
    let output = env.append(&["--derived", "--json"], "order-9", 0, &events);
    assert!(output.status.success(), "{}", stderr(&output));
    let record = &json_lines(&output)[0];
    let id = record["commitId"].as_str().unwrap();
    assert_eq!(id.len(), 17 + 1 + "order-9".len());
    assert_eq!(&id[17..], ":order-9");
    assert!(id[..17].bytes().all(|b| b.is_ascii_digit()));

    let scan = env.run(&["--derived", "scan", "--from", &id[..17], "--json"]);
    assert_eq!(json_lines(&scan).len(), 1);
}

#[test]
fn test_scan_limit_reports_resume_point() {
    let env = Env::new();
    let events = env.write("events.json", "[]");
    assert!(env.run(&["init"]).status.success());
    for version in 0..3 {
        assert!(env.append(&[], "a", version, &events).status.success());
    }

    let page = env.run(&["scan", "--limit", "2", "--json"]);
    let first = json_lines(&page);
    assert_eq!(first.len(), 2);
    let token = resume_token(&page).unwrap();

    let rest = env.run(&["scan", "--after", &token, "--limit", "2", "--json"]);
    assert!(rest.status.success(), "{}", stderr(&rest));
    let second = json_lines(&rest);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0]["version"], 2);
    assert_eq!(resume_token(&rest), None);

    // One page at a time visits every commit exactly once.
    let mut versions = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let mut args = vec!["scan", "--limit", "1", "--json"];
        if let Some(token) = &token {
            args.extend(["--after", token.as_str()]);
        }
        let page = env.run(&args);
        for record in json_lines(&page) {
            versions.push(record["version"].as_u64().unwrap());
        }
        token = resume_token(&page);
        if token.is_none() {
            break;
        }
    }
    assert_eq!(versions, vec![0, 1, 2]);
}

#[test]
fn test_scan_rejects_bad_resume_tokens() {
    let env = Env::new();
    let events = env.write("events.json", "[]");
    assert!(env.run(&["init"]).status.success());
    for version in 0..2 {
        assert!(env.append(&[], "a", version, &events).status.success());
    }

    let garbage = env.run(&["scan", "--after", "2"]);
    assert_eq!(garbage.status.code(), Some(1));
    assert!(stderr(&garbage).contains("invalid resume token"));

    // A counter token means nothing to a derived store.
    let page = env.run(&["scan", "--limit", "1"]);
    let token = resume_token(&page).unwrap();
    let other = env.run(&["--derived", "scan", "--after", &token]);
    assert_eq!(other.status.code(), Some(1));
    assert!(stderr(&other).contains("invalid resume token"));
}

#[test]
fn test_config_file_selects_tables_and_strategy() {
    let env = Env::new();
    let config = env.write(
        "store.toml",
        "commit_table = \"ledger\"\nsequence = \"derived\"\n",
    );
    let config = config.to_str().unwrap();

    let init = env.run(&["--config", config, "init"]);
    assert!(init.status.success(), "{}", stderr(&init));
    assert!(stdout(&init).contains("Created table ledger (sequence: derived)"));

    // The default commit table was never created.
    assert_eq!(env.run(&["query", "a"]).status.code(), Some(1));

    let bad = env.write("bad.toml", "sequence = \"uuid\"\n");
    let output = env.run(&["--config", bad.to_str().unwrap(), "init"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("failed to load config"));
}

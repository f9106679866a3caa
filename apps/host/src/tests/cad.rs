// Unit tests for the journal-backed CAD collaborator.

use crate::cad::JournalCadHost;

use bridge_core::error::handler::codes;
use bridge_core::handlers::{BlockInserter, CommandExecutor, InsertBlockRequest, Placement};

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

fn insert_request(name: &str) -> InsertBlockRequest {
    InsertBlockRequest {
        block_path: PathBuf::from("/library/chair.dwg"),
        block_name: name.to_string(),
        placement: Some(Placement {
            x: 10.0,
            y: 20.0,
            z: 0.0,
        }),
        scale: Some(2.0),
        rotation: None,
    }
}

#[test]
fn given_journal_when_command_executed_then_line_appended_and_counted() {
    let dir = TempDir::new().expect("temp dir");
    let journal = dir.path().join("nested").join("journal.log");
    let host = JournalCadHost::new(Some(journal.clone()));

    let first = host.execute("LINE 0,0 10,10").expect("execute");
    let second = host.execute("REGEN").expect("execute");

    assert!(first.is_success && second.is_success);
    assert!(second.message.is_some_and(|m| m.contains("#2")));
    assert_eq!(host.stats().commands, 2);

    let contents = fs::read_to_string(&journal).expect("journal written");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("COMMAND LINE 0,0 10,10"));
    assert!(lines[1].ends_with("COMMAND REGEN"));
}

#[test]
fn given_journal_when_block_inserted_then_placement_recorded() {
    let dir = TempDir::new().expect("temp dir");
    let journal = dir.path().join("journal.log");
    let host = JournalCadHost::new(Some(journal.clone()));

    assert!(host.insert_block(&insert_request("CHAIR")).expect("insert"));
    assert_eq!(host.stats().insertions, 1);

    let contents = fs::read_to_string(&journal).expect("journal written");
    assert!(contents.contains("INSERT CHAIR FROM /library/chair.dwg AT (10, 20, 0) SCALE 2 ROTATION 0"));
}

/// **VALUE**: Verifies a multi-line command is refused instead of journaled.
///
/// **BUG THIS CATCHES**: Writing the raw text would split one request into several
/// journal entries that were never requested.
#[test]
fn given_multi_line_command_when_executed_then_failed_outcome_and_nothing_written() {
    let dir = TempDir::new().expect("temp dir");
    let journal = dir.path().join("journal.log");
    let host = JournalCadHost::new(Some(journal.clone()));

    let outcome = host.execute("ERASE\nALL").expect("outcome");
    assert!(!outcome.is_success);
    assert!(!journal.exists());
    assert_eq!(host.stats().commands, 0);
}

#[test]
fn given_session_in_use_when_command_arrives_then_host_busy() {
    let host = JournalCadHost::new(None);
    let _held = host.begin("test").expect("first operation");

    let err = host.execute("REGEN").expect_err("busy");
    assert_eq!(err.code, codes::HOST_BUSY);
}

#[test]
fn given_no_journal_when_operations_run_then_succeed_without_files() {
    let host = JournalCadHost::new(None);

    assert!(host.execute("ZOOM E").expect("execute").is_success);
    assert!(host.insert_block(&insert_request("X")).expect("insert"));
    assert!(host.journal().is_none());
}

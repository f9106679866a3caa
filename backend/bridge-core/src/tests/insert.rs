// Unit tests for INSERT_BLOCK through the dispatch table.

use crate::config::LibraryConfig;
use crate::error::HandlerError;
use crate::error::handler::codes;
use crate::handlers::{BlockInserter, BlockLibraryHandlers, InsertBlockRequest, actions};
use crate::ipc::dispatch::DispatchTable;
use crate::ipc::message::IpcRequest;

use std::fs;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingInserter {
    inserted: Mutex<Vec<InsertBlockRequest>>,
}

impl BlockInserter for RecordingInserter {
    fn insert_block(&self, request: &InsertBlockRequest) -> Result<bool, HandlerError> {
        self.inserted.lock().expect("lock").push(request.clone());
        Ok(request.block_name != "declined")
    }
}

fn table(inserter: Arc<RecordingInserter>) -> DispatchTable {
    let mut table = DispatchTable::new();
    BlockLibraryHandlers::new(&LibraryConfig::default())
        .with_block_inserter(inserter)
        .register(&mut table);
    table
}

#[tokio::test]
async fn given_existing_block_when_insert_then_true_and_defaults_applied() {
    let dir = TempDir::new().expect("temp dir");
    let block = dir.path().join("chair.dwg");
    fs::write(&block, b"dwg").expect("write");
    let inserter = Arc::new(RecordingInserter::default());

    let request = IpcRequest::new(
        actions::INSERT_BLOCK,
        Some(json!({ "BlockPath": block, "BlockName": "" })),
    );
    let response = table(Arc::clone(&inserter)).dispatch(&request).await;

    assert!(response.data_as::<bool>().expect("bool result"));
    let inserted = inserter.inserted.lock().expect("lock");
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].block_name, "chair");
    assert_eq!(inserted[0].scale(), 1.0);
    assert_eq!(inserted[0].rotation(), 0.0);
}

#[tokio::test]
async fn given_placement_when_insert_then_passed_through() {
    let dir = TempDir::new().expect("temp dir");
    let block = dir.path().join("desk.dwg");
    fs::write(&block, b"dwg").expect("write");
    let inserter = Arc::new(RecordingInserter::default());

    let request = IpcRequest::new(
        actions::INSERT_BLOCK,
        Some(json!({
            "BlockPath": block,
            "BlockName": "DESK",
            "Placement": { "X": 1.5, "Y": -2.0 },
            "Scale": 2.0,
            "Rotation": 90.0
        })),
    );
    let response = table(Arc::clone(&inserter)).dispatch(&request).await;
    assert!(response.is_success());

    let inserted = inserter.inserted.lock().expect("lock");
    let placement = inserted[0].placement();
    assert_eq!((placement.x, placement.y, placement.z), (1.5, -2.0, 0.0));
    assert_eq!(inserted[0].scale(), 2.0);
    assert_eq!(inserted[0].rotation(), 90.0);
}

#[tokio::test]
async fn given_host_declines_when_insert_then_false() {
    let dir = TempDir::new().expect("temp dir");
    let block = dir.path().join("x.dwg");
    fs::write(&block, b"dwg").expect("write");

    let request = IpcRequest::new(
        actions::INSERT_BLOCK,
        Some(json!({ "BlockPath": block, "BlockName": "declined" })),
    );
    let response = table(Arc::new(RecordingInserter::default()))
        .dispatch(&request)
        .await;
    assert!(!response.data_as::<bool>().expect("bool result"));
}

#[tokio::test]
async fn given_missing_block_when_insert_then_block_not_found_and_host_untouched() {
    let dir = TempDir::new().expect("temp dir");
    let inserter = Arc::new(RecordingInserter::default());

    let request = IpcRequest::new(
        actions::INSERT_BLOCK,
        Some(json!({ "BlockPath": dir.path().join("gone.dwg"), "BlockName": "gone" })),
    );
    let response = table(Arc::clone(&inserter)).dispatch(&request).await;

    assert_eq!(response.error_code(), Some(codes::BLOCK_NOT_FOUND));
    assert!(inserter.inserted.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn given_non_positive_scale_when_insert_then_invalid_request() {
    let dir = TempDir::new().expect("temp dir");
    let block = dir.path().join("x.dwg");
    fs::write(&block, b"dwg").expect("write");

    let request = IpcRequest::new(
        actions::INSERT_BLOCK,
        Some(json!({ "BlockPath": block, "BlockName": "x", "Scale": 0.0 })),
    );
    let response = table(Arc::new(RecordingInserter::default()))
        .dispatch(&request)
        .await;
    assert_eq!(response.error_code(), Some(codes::INVALID_REQUEST));
}

#[tokio::test]
async fn given_directory_as_block_path_when_insert_then_block_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let inserter = Arc::new(RecordingInserter::default());

    let request = IpcRequest::new(
        actions::INSERT_BLOCK,
        Some(json!({ "BlockPath": dir.path(), "BlockName": "folder" })),
    );
    let response = table(Arc::clone(&inserter)).dispatch(&request).await;

    assert_eq!(response.error_code(), Some(codes::BLOCK_NOT_FOUND));
    assert!(inserter.inserted.lock().expect("lock").is_empty());
}

use crate::helpers::{connected_client, start_bridge, test_config, unique_pipe_name};

use bridge_core::config::BridgeConfig;
use bridge_core::error::handler::codes;
use bridge_core::handlers::{BlockLibraryHandlers, PreviewResult, TreeNode, TreeRequest, actions};
use bridge_core::ipc::{DispatchTable, IpcRequest};

use std::fs;

use serde_json::json;
use tempfile::TempDir;

fn library_table(config: &BridgeConfig) -> DispatchTable {
    let mut table = DispatchTable::new();
    BlockLibraryHandlers::new(&config.library)
        .with_file_system()
        .register(&mut table);
    table
}

/// **VALUE**: Verifies the full request path for the tree listing: client encode,
/// frame, server dispatch, filesystem walk, response decode.
///
/// **WHY THIS MATTERS**: This is the call the palette makes on every open.
#[tokio::test]
async fn given_library_on_disk_when_tree_requested_over_pipe_then_same_tree_each_time() {
    // GIVEN: root/{a.dwg, sub/b.dwg} and a bridge serving the filesystem library
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path().join("root");
    fs::create_dir_all(root.join("sub")).expect("mkdir");
    fs::write(root.join("a.dwg"), b"a").expect("write");
    fs::write(root.join("sub").join("b.dwg"), b"b").expect("write");

    let config = test_config(&unique_pipe_name());
    let host = start_bridge(&config, library_table(&config)).await;
    let mut client = connected_client(&config).await;

    // WHEN: The tree is requested twice
    let payload = TreeRequest {
        root_path: Some(root.clone()),
    };
    let mut trees = Vec::new();
    for _ in 0..2 {
        let request = IpcRequest::with_payload(actions::GET_BLOCK_LIBRARY_TREE, &payload)
            .expect("encode payload");
        let response = client.send_request(&request).await.expect("round trip");
        trees.push(response.data_as::<TreeNode>().expect("tree"));
    }

    // THEN: Identical trees, folder before file
    assert_eq!(trees[0], trees[1]);
    assert_eq!(trees[0].child_names(), vec!["sub", "a.dwg"]);
    assert_eq!(trees[0].children[0].child_names(), vec!["b.dwg"]);

    host.dispose().await;
}

#[tokio::test]
async fn given_missing_directory_when_tree_requested_then_directory_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(&unique_pipe_name());
    let host = start_bridge(&config, library_table(&config)).await;
    let mut client = connected_client(&config).await;

    let payload = TreeRequest {
        root_path: Some(dir.path().join("missing")),
    };
    let request = IpcRequest::with_payload(actions::GET_BLOCK_LIBRARY_TREE, &payload)
        .expect("encode payload");
    let response = client.send_request(&request).await.expect("round trip");

    assert_eq!(response.error_code(), Some(codes::DIRECTORY_NOT_FOUND));
    assert!(client.is_connected());

    host.dispose().await;
}

#[tokio::test]
async fn given_drawing_with_companion_when_preview_requested_then_image_returned() {
    let dir = TempDir::new().expect("temp dir");
    let drawing = dir.path().join("sofa.dwg");
    fs::write(&drawing, b"dwg").expect("write");
    fs::write(dir.path().join("sofa.png"), b"png-bytes").expect("write");

    let config = test_config(&unique_pipe_name());
    let host = start_bridge(&config, library_table(&config)).await;
    let mut client = connected_client(&config).await;

    let request = IpcRequest::new(
        actions::GET_FILE_PREVIEW,
        Some(json!({ "FilePath": drawing })),
    );
    let preview: PreviewResult = client
        .send_request(&request)
        .await
        .expect("round trip")
        .data_as()
        .expect("preview");

    assert!(preview.is_success);
    assert!(preview.has_image());

    host.dispose().await;
}

#[tokio::test]
async fn given_host_without_cad_collaborators_when_insert_requested_then_unknown_action() {
    let config = test_config(&unique_pipe_name());
    let host = start_bridge(&config, library_table(&config)).await;
    let mut client = connected_client(&config).await;

    let response = client
        .request(actions::INSERT_BLOCK, Some(json!({ "BlockPath": "x.dwg" })))
        .await
        .expect("round trip");
    assert_eq!(response.error_code(), Some(codes::UNKNOWN_ACTION));

    host.dispose().await;
}

/// **VALUE**: A preview image over the configured limit comes back as a failed
/// preview on a connection that stays usable.
///
/// **BUG THIS CATCHES**: An oversized preview used to exceed the frame limit,
/// turning a business failure into a dropped connection.
#[tokio::test]
async fn given_image_over_preview_limit_when_preview_requested_then_failed_preview_and_still_connected()
 {
    let dir = TempDir::new().expect("temp dir");
    let image = dir.path().join("huge.png");
    fs::write(&image, vec![0u8; 64 * 1024]).expect("write");

    let mut config = test_config(&unique_pipe_name());
    config.library.max_preview_bytes = 16 * 1024;
    let host = start_bridge(&config, library_table(&config)).await;
    let mut client = connected_client(&config).await;

    let preview: PreviewResult = client
        .request(actions::GET_FILE_PREVIEW, Some(json!({ "FilePath": image })))
        .await
        .expect("round trip")
        .data_as()
        .expect("preview");

    assert!(!preview.is_success);
    assert!(
        preview
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("too large"))
    );
    assert!(client.is_connected());

    host.dispose().await;
}

/// **VALUE**: When a response still would not fit in one frame, the server
/// answers `ACTION_ERROR` and the next request on the same connection works.
#[tokio::test]
async fn given_response_over_frame_limit_when_requested_then_action_error_and_connection_kept() {
    let dir = TempDir::new().expect("temp dir");
    let image = dir.path().join("big.png");
    fs::write(&image, vec![0u8; 96 * 1024]).expect("write");

    // Preview limit above what the frame can carry once base64 encoded.
    let mut config = test_config(&unique_pipe_name());
    config.pipe.max_frame_bytes = 64 * 1024;
    config.library.max_preview_bytes = 1024 * 1024;
    let host = start_bridge(&config, library_table(&config)).await;
    let mut client = connected_client(&config).await;

    let response = client
        .request(actions::GET_FILE_PREVIEW, Some(json!({ "FilePath": image })))
        .await
        .expect("oversized response must not break the round trip");
    assert_eq!(response.error_code(), Some(codes::ACTION_ERROR));
    assert!(client.is_connected());

    let missing = dir.path().join("missing");
    let follow_up = client
        .request(
            actions::GET_BLOCK_LIBRARY_TREE,
            Some(json!({ "RootPath": missing })),
        )
        .await
        .expect("connection still usable");
    assert_eq!(follow_up.error_code(), Some(codes::DIRECTORY_NOT_FOUND));

    host.dispose().await;
}

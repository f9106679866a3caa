use block_library_host::cad::JournalCadHost;
use block_library_host::composition::{build_bridge, build_dispatch_table, start_bridge};

use bridge_core::config::{BridgeConfig, ClientSettings, PipeConfig, ServerSettings};
use bridge_core::error::CoreError;
use bridge_core::error::handler::codes;
use bridge_core::handlers::{ExecuteCommandResult, TreeNode, actions};
use bridge_core::ipc::state::wait_for_state;
use bridge_core::ipc::{IpcClient, ServerState};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

const STATE_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config(library_root: &Path, journal: &Path) -> BridgeConfig {
    let id = Uuid::new_v4().simple().to_string();
    let mut config = BridgeConfig {
        pipe: PipeConfig {
            name: format!("blb-host-{}", &id[..12]),
            ..PipeConfig::default()
        },
        server: ServerSettings {
            accept_retry_delay_ms: 50,
            stop_timeout_ms: 2_000,
        },
        client: ClientSettings {
            connect_timeout_ms: 2_000,
            max_connect_attempts: 5,
            initial_backoff_ms: 20,
        },
        ..BridgeConfig::default()
    };
    config.library.root_path = Some(library_root.to_path_buf());
    config.library.journal_file = Some(journal.to_path_buf());
    config
}

#[test]
fn given_config_when_dispatch_table_built_then_all_block_library_actions_registered() {
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(dir.path(), &dir.path().join("journal.log"));

    let table = build_dispatch_table(&config, Arc::new(JournalCadHost::new(None)));

    assert_eq!(
        table.actions(),
        vec![
            actions::EXECUTE_COMMAND,
            actions::GET_BLOCK_LIBRARY_TREE,
            actions::GET_FILE_PREVIEW,
            actions::INSERT_BLOCK,
        ]
    );
}

/// **VALUE**: Verifies the composed host serves every canonical action over a real
/// channel, with the CAD actions reaching the journal.
///
/// **WHY THIS MATTERS**: This is the wiring the shipped binary runs; each piece can
/// pass its own tests and still be composed wrongly.
#[tokio::test]
async fn given_composed_host_when_client_calls_each_action_then_all_served() {
    // GIVEN: A library with one block and a started host
    let dir = TempDir::new().expect("temp dir");
    let library = dir.path().join("library");
    fs::create_dir_all(&library).expect("mkdir");
    let block = library.join("chair.dwg");
    fs::write(&block, b"dwg").expect("write");
    let journal = dir.path().join("journal.log");
    let config = test_config(&library, &journal);

    let bridge = build_bridge(&config);
    let mut state = bridge.subscribe_state();
    bridge.start().expect("start");
    assert!(wait_for_state(&mut state, ServerState::Listening, STATE_TIMEOUT).await);

    let mut client = IpcClient::from_config(&config);
    client.connect().await.expect("connect");

    // WHEN/THEN: Tree from the configured root
    let tree: TreeNode = client
        .request(actions::GET_BLOCK_LIBRARY_TREE, None)
        .await
        .expect("round trip")
        .data_as()
        .expect("tree");
    assert_eq!(tree.child_names(), vec!["chair.dwg"]);

    // Preview of a drawing without a companion image still succeeds
    let preview = client
        .request(actions::GET_FILE_PREVIEW, Some(json!({ "FilePath": block })))
        .await
        .expect("round trip");
    assert_eq!(preview.data.expect("data")["IsSuccess"], true);

    // Command is journaled
    let command: ExecuteCommandResult = client
        .request(actions::EXECUTE_COMMAND, Some(json!({ "Command": "REGEN" })))
        .await
        .expect("round trip")
        .data_as()
        .expect("command result");
    assert!(command.is_success);

    // Insert is journaled
    let inserted: bool = client
        .request(
            actions::INSERT_BLOCK,
            Some(json!({ "BlockPath": block, "BlockName": "CHAIR" })),
        )
        .await
        .expect("round trip")
        .data_as()
        .expect("bool");
    assert!(inserted);

    // Missing block is a handler error, not a dropped connection
    let missing = client
        .request(
            actions::INSERT_BLOCK,
            Some(json!({ "BlockPath": library.join("nope.dwg"), "BlockName": "NOPE" })),
        )
        .await
        .expect("round trip");
    assert_eq!(missing.error_code(), Some(codes::BLOCK_NOT_FOUND));

    client.disconnect().await;
    bridge.dispose().await;

    let contents = fs::read_to_string(&journal).expect("journal");
    assert!(contents.contains("COMMAND REGEN"));
    assert!(contents.contains("INSERT CHAIR"));
    assert!(!contents.contains("NOPE"));
}

#[tokio::test]
async fn given_config_dir_when_start_bridge_then_loads_file_and_listens() {
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(dir.path(), &dir.path().join("journal.log"));
    config.save(dir.path()).expect("save config");

    let (bridge, loaded) = start_bridge(dir.path()).expect("start");
    assert_eq!(loaded, config);

    let mut state = bridge.subscribe_state();
    assert!(wait_for_state(&mut state, ServerState::Listening, STATE_TIMEOUT).await);
    bridge.dispose().await;
}

#[tokio::test]
async fn given_invalid_config_file_when_start_bridge_then_config_error() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("bridge.json"), r#"{"version": 7}"#).expect("write");

    match start_bridge(dir.path()) {
        Err(CoreError::Config(_)) => {}
        Err(other) => panic!("expected config error, got {other:?}"),
        Ok(_) => panic!("invalid config should not start a bridge"),
    }
}

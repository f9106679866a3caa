//! Test helpers for bridge integration tests.
//!
//! Every test gets its own channel name so tests can run in parallel without
//! fighting over one endpoint.

use bridge_core::config::{BridgeConfig, ClientSettings, PipeConfig, ServerSettings};
use bridge_core::error::HandlerError;
use bridge_core::ipc::endpoint::{self, BoxedStream};
use bridge_core::ipc::frame::{read_frame, write_frame};
use bridge_core::ipc::state::wait_for_state;
use bridge_core::ipc::{BridgeHost, DispatchTable, IpcClient, IpcResponse, ServerState};

use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

pub const STATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Short, unique channel name (Unix socket paths are length-limited).
pub fn unique_pipe_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("blb-test-{}", &id[..12])
}

/// Config with timings small enough for tests.
pub fn test_config(pipe_name: &str) -> BridgeConfig {
    BridgeConfig {
        pipe: PipeConfig {
            name: pipe_name.to_string(),
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
    }
}

/// `ECHO` returns its data, `FAIL` returns `HOST_BUSY`, `SLOW_ECHO` echoes after 50 ms.
pub fn test_dispatch_table() -> DispatchTable {
    let mut table = DispatchTable::new();
    table
        .register_handler("ECHO", |data: Value| async move {
            Ok::<_, HandlerError>(data)
        })
        .register_handler("SLOW_ECHO", |data: Value| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, HandlerError>(data)
        })
        .register_handler("FAIL", |_| async {
            Err::<Value, _>(HandlerError::host_busy("drawing is locked"))
        });
    table
}

/// Start a bridge on `config` and wait until it is listening.
pub async fn start_bridge(config: &BridgeConfig, table: DispatchTable) -> BridgeHost {
    let host = BridgeHost::from_config(config, table);
    let mut state = host.subscribe_state();
    host.start().expect("Failed to start bridge");
    assert!(
        wait_for_state(&mut state, ServerState::Listening, STATE_TIMEOUT).await,
        "bridge never reached listening"
    );
    host
}

/// Start a bridge with [`test_dispatch_table`] on a fresh channel.
pub async fn start_test_bridge() -> (BridgeHost, BridgeConfig) {
    let config = test_config(&unique_pipe_name());
    let host = start_bridge(&config, test_dispatch_table()).await;
    (host, config)
}

pub async fn connected_client(config: &BridgeConfig) -> IpcClient {
    let mut client = IpcClient::from_config(config);
    client.connect().await.expect("Failed to connect client");
    client
}

/// Connect below the client connector, for tests that write raw frames.
pub async fn connect_raw(config: &BridgeConfig) -> BoxedStream {
    endpoint::connect(&config.pipe.name)
        .await
        .expect("Failed to open raw connection")
}

pub async fn send_raw(stream: &mut BoxedStream, payload: &[u8]) -> IpcResponse {
    write_frame(stream, payload)
        .await
        .expect("Failed to write frame");
    let frame = read_frame(stream).await.expect("Failed to read frame");
    IpcResponse::from_bytes(&frame).expect("Response should decode")
}

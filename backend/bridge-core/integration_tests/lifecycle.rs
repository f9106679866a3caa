use crate::helpers::{
    STATE_TIMEOUT, connected_client, start_test_bridge, test_config, test_dispatch_table,
    unique_pipe_name,
};

use bridge_core::error::ipc::IpcError;
use bridge_core::ipc::state::wait_for_state;
use bridge_core::ipc::{BridgeHost, IpcServer, ServerState};

#[tokio::test]
async fn given_new_bridge_when_inspected_then_idle_and_not_running() {
    let config = test_config(&unique_pipe_name());
    let host = BridgeHost::from_config(&config, test_dispatch_table());

    assert_eq!(host.state(), ServerState::Idle);
    assert!(!host.is_running());
    assert!(!host.is_disposed());
}

/// **VALUE**: Verifies `start` and `stop` can be called repeatedly.
///
/// **WHY THIS MATTERS**: Host plugins call these from load/unload hooks that may
/// fire more than once.
#[tokio::test]
async fn given_running_bridge_when_start_and_stop_repeated_then_idempotent() {
    let (host, _config) = start_test_bridge().await;

    host.start().expect("second start is a no-op");
    assert!(host.is_running());

    host.stop().await;
    host.stop().await;
    assert!(!host.is_running());
    assert_eq!(host.state(), ServerState::Stopped);
}

#[tokio::test]
async fn given_stopped_bridge_when_started_again_then_serves() {
    let (host, config) = start_test_bridge().await;
    host.stop().await;

    let mut state = host.subscribe_state();
    host.start().expect("restart");
    assert!(wait_for_state(&mut state, ServerState::Listening, STATE_TIMEOUT).await);

    let mut client = connected_client(&config).await;
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    host.dispose().await;
}

#[tokio::test]
async fn given_connected_client_when_stop_then_stops_within_bound() {
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    // The serve loop is parked on a frame read; stop must cancel it.
    let stopped = tokio::time::timeout(STATE_TIMEOUT, host.stop()).await;
    assert!(stopped.is_ok(), "stop should not hang on an idle connection");
    assert_eq!(host.state(), ServerState::Stopped);
}

#[tokio::test]
async fn given_disposed_bridge_when_dispose_again_then_no_op_and_start_rejected() {
    let (host, _config) = start_test_bridge().await;

    host.dispose().await;
    host.dispose().await;
    assert!(host.is_disposed());
    assert!(!host.is_running());

    let err = host.start().expect_err("disposed");
    assert!(matches!(err, IpcError::Runtime { .. }), "got {err:?}");
}

#[test]
fn given_no_runtime_when_start_then_runtime_error() {
    let config = test_config(&unique_pipe_name());
    let server = IpcServer::from_config(&config, test_dispatch_table());

    let err = server.start().expect_err("no tokio runtime");
    assert!(matches!(err, IpcError::Runtime { .. }), "got {err:?}");
    assert!(!server.is_running());
}

/// **VALUE**: Verifies dropping an undisposed bridge releases the endpoint.
///
/// **BUG THIS CATCHES**: A background task that outlives its owner would keep the
/// channel bound, and the next host instance could never listen.
#[tokio::test]
async fn given_bridge_dropped_without_dispose_when_rebound_then_new_bridge_listens() {
    let (host, config) = start_test_bridge().await;
    drop(host);

    let replacement = crate::helpers::start_bridge(&config, test_dispatch_table()).await;
    let mut client = connected_client(&config).await;
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    replacement.dispose().await;
}

#[cfg(unix)]
#[tokio::test]
async fn given_stopped_bridge_when_stopped_then_socket_file_removed() {
    let (host, config) = start_test_bridge().await;
    let path = bridge_core::ipc::endpoint::endpoint_path(&config.pipe.name);
    assert!(path.exists());

    host.dispose().await;
    assert!(!path.exists());
}

/// **VALUE**: A socket file left by a crashed host does not block a new bridge.
#[cfg(unix)]
#[tokio::test]
async fn given_stale_socket_file_when_bridge_started_then_replaced_and_listening() {
    let config = test_config(&unique_pipe_name());
    let path = bridge_core::ipc::endpoint::endpoint_path(&config.pipe.name);

    // A listener dropped without unlinking leaves a socket nobody answers on.
    drop(std::os::unix::net::UnixListener::bind(&path).expect("bind leftover socket"));
    assert!(path.exists());

    let host = crate::helpers::start_bridge(&config, test_dispatch_table()).await;
    let mut client = connected_client(&config).await;
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    host.dispose().await;
}

/// **BUG THIS CATCHES**: A second bridge on a live name stealing the socket
/// file, or its liveness check breaking the first bridge's service.
#[cfg(unix)]
#[tokio::test]
async fn given_live_bridge_when_second_bridge_binds_same_name_then_first_keeps_serving() {
    let (first, config) = start_test_bridge().await;

    let second = BridgeHost::from_config(&config, test_dispatch_table());
    second.start().expect("start is accepted; the bind is retried in the background");
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_ne!(second.state(), ServerState::Listening);

    let mut client = connected_client(&config).await;
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    second.dispose().await;
    first.dispose().await;
}

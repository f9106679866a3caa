use crate::helpers::{connected_client, start_test_bridge, test_config, unique_pipe_name};

use bridge_core::config::ClientSettings;
use bridge_core::error::ipc::IpcError;
use bridge_core::ipc::{IpcClient, IpcRequest};

use std::time::{Duration, Instant};

/// **VALUE**: Verifies the connector gives up after the configured attempts and
/// reports it once, with a message pointing at the likely causes.
///
/// **WHY THIS MATTERS**: When the host is not running the UI must show a useful
/// error quickly instead of hanging or retrying forever.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Retries never stop
/// - The attempt count is off by one
/// - Backoff is skipped (all attempts fire at once)
#[tokio::test]
async fn given_no_server_when_connect_then_connect_failed_after_all_attempts() {
    // GIVEN: A client for a channel nobody listens on
    let mut config = test_config(&unique_pipe_name());
    config.client = ClientSettings {
        connect_timeout_ms: 500,
        max_connect_attempts: 3,
        initial_backoff_ms: 20,
    };
    let mut client = IpcClient::from_config(&config);

    // WHEN: Connecting
    let started = Instant::now();
    let err = client.connect().await.expect_err("nothing to connect to");

    // THEN: One ConnectFailed naming the attempts, after at least 20 + 40 ms of backoff
    match err {
        IpcError::ConnectFailed {
            attempts, message, ..
        } => {
            assert_eq!(attempts, 3);
            assert!(message.contains(&config.pipe.name));
            assert!(message.contains("host application is running"));
        }
        other => panic!("expected ConnectFailed, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn given_not_connected_when_send_request_then_not_connected_without_io() {
    let config = test_config(&unique_pipe_name());
    let mut client = IpcClient::from_config(&config);

    let err = client
        .send_request(&IpcRequest::new("ECHO", None))
        .await
        .expect_err("not connected");
    assert!(matches!(err, IpcError::NotConnected { .. }), "got {err:?}");
}

#[tokio::test]
async fn given_connected_client_when_connect_again_then_no_op() {
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;

    client.connect().await.expect("second connect is a no-op");
    assert!(client.is_connected());
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    host.dispose().await;
}

#[tokio::test]
async fn given_connected_client_when_disconnect_twice_then_idempotent() {
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;

    client.disconnect().await;
    client.disconnect().await;
    assert!(!client.is_connected());

    let err = client
        .request("ECHO", None)
        .await
        .expect_err("disconnected");
    assert!(matches!(err, IpcError::NotConnected { .. }));

    host.dispose().await;
}

/// **VALUE**: Verifies `is_connected` turns false once the server goes away.
///
/// **BUG THIS CATCHES**: A flag that only tracks intent would report a dead pipe
/// as connected and every later call would fail with a confusing I/O error.
#[tokio::test]
async fn given_server_stopped_when_request_sent_then_transport_error_and_disconnected() {
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    host.dispose().await;

    let err = client
        .request("ECHO", None)
        .await
        .expect_err("server is gone");
    assert!(err.is_transport(), "got {err:?}");
    assert!(!client.is_connected());
}

/// **VALUE**: `is_connected` reads the pipe itself, so it turns false as soon
/// as the server goes away, with no request in between.
///
/// **WHY THIS MATTERS**: The palette checks the connection before offering
/// actions; a cached flag would keep offering them against a dead host.
#[tokio::test]
async fn given_server_disposed_when_idle_client_checks_then_not_connected() {
    // GIVEN: A connected client that has not sent anything
    let (host, config) = start_test_bridge().await;
    let client = connected_client(&config).await;
    assert!(client.is_connected());

    // WHEN: The server is disposed
    host.dispose().await;

    // THEN: The hangup is visible without any I/O from the client
    let deadline = Instant::now() + Duration::from_secs(2);
    while client.is_connected() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!client.is_connected());
}

#[tokio::test]
async fn given_idle_server_when_client_checks_twice_then_still_connected() {
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.is_connected());
    assert!(client.is_connected());
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());
    assert!(client.is_connected());

    host.dispose().await;
}

/// **BUG THIS CATCHES**: `connect` treating a closed connection as current and
/// returning early, leaving the client stuck on a dead pipe.
#[tokio::test]
async fn given_server_restarted_when_connect_again_then_dead_connection_replaced() {
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;

    host.dispose().await;
    let deadline = Instant::now() + Duration::from_secs(2);
    while client.is_connected() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let host = crate::helpers::start_bridge(&config, crate::helpers::test_dispatch_table()).await;
    client.connect().await.expect("reconnect");
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    host.dispose().await;
}

#[tokio::test]
async fn given_server_starting_late_when_connect_then_retry_succeeds() {
    let mut config = test_config(&unique_pipe_name());
    config.client = ClientSettings {
        connect_timeout_ms: 500,
        max_connect_attempts: 6,
        initial_backoff_ms: 50,
    };

    let server_config = config.clone();
    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        crate::helpers::start_bridge(&server_config, crate::helpers::test_dispatch_table()).await
    });

    let mut client = IpcClient::from_config(&config);
    client.connect().await.expect("a later attempt should connect");

    let host = server.await.expect("server task");
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());
    host.dispose().await;
}

use crate::helpers::{connect_raw, connected_client, send_raw, start_test_bridge};

use bridge_core::error::handler::codes;
use bridge_core::ipc::frame::{read_frame, write_frame};
use bridge_core::ipc::{IpcRequest, IpcResponse};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// **VALUE**: Verifies every response carries the id of the request that triggered it.
///
/// **WHY THIS MATTERS**: The UI matches responses to pending calls by `MessageId`;
/// a wrong id resolves the wrong call.
#[tokio::test]
async fn given_running_bridge_when_requests_sent_then_each_response_echoes_its_id() {
    // GIVEN: Running bridge and connected client
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;

    // WHEN/THEN: Several requests each get their own id back, in order
    for n in 0..5 {
        let request = IpcRequest::new("ECHO", Some(json!({ "N": n })));
        let response = client.send_request(&request).await.expect("round trip");

        assert_eq!(response.message_id, request.message_id);
        assert_eq!(response.action, "ECHO");
        assert_eq!(response.data, Some(json!({ "N": n })));
    }

    client.disconnect().await;
    host.dispose().await;
}

/// **VALUE**: Verifies a handler failure does not end the connection.
///
/// **BUG THIS CATCHES**: Treating a handler error like a transport error would drop
/// the client after its first failed request.
#[tokio::test]
async fn given_failing_handler_when_next_request_sent_then_connection_still_serves() {
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;

    let failed = client.request("FAIL", None).await.expect("error response");
    assert_eq!(failed.error_code(), Some(codes::HOST_BUSY));
    assert!(failed.data.is_none());

    let ok = client
        .request("ECHO", Some(json!("still here")))
        .await
        .expect("success response");
    assert!(ok.is_success());
    assert!(client.is_connected());

    host.dispose().await;
}

#[tokio::test]
async fn given_unknown_action_when_sent_then_unknown_action_response() {
    let (host, config) = start_test_bridge().await;
    let mut client = connected_client(&config).await;

    let response = client.request("NO_SUCH_ACTION", None).await.expect("response");
    assert_eq!(response.error_code(), Some(codes::UNKNOWN_ACTION));

    host.dispose().await;
}

/// **VALUE**: Verifies malformed JSON inside a valid frame is answered, not fatal.
///
/// **WHY THIS MATTERS**: Only transport failures may end a connection; a buggy
/// payload from the UI should come back as `INVALID_REQUEST`.
#[tokio::test]
async fn given_malformed_json_frame_when_sent_then_invalid_request_and_connection_kept() {
    let (host, config) = start_test_bridge().await;
    let mut stream = connect_raw(&config).await;

    let response = send_raw(&mut stream, b"{\"MessageId\": oops").await;
    assert_eq!(response.error_code(), Some(codes::INVALID_REQUEST));
    assert_eq!(response.message_id, "");

    let request = IpcRequest::new("ECHO", Some(json!(1)));
    let response = send_raw(&mut stream, &request.to_bytes().expect("encode")).await;
    assert!(response.is_success());
    assert_eq!(response.message_id, request.message_id);

    host.dispose().await;
}

#[tokio::test]
async fn given_envelope_without_action_when_sent_then_invalid_request_with_recovered_id() {
    let (host, config) = start_test_bridge().await;
    let mut stream = connect_raw(&config).await;

    let response = send_raw(
        &mut stream,
        br#"{"MessageId":"abc-123","MessageType":"REQUEST"}"#,
    )
    .await;
    assert_eq!(response.error_code(), Some(codes::INVALID_REQUEST));
    assert_eq!(response.message_id, "abc-123");

    host.dispose().await;
}

/// **VALUE**: Verifies a client that vanishes mid-frame leaves the server able to
/// accept the next client.
///
/// **WHY THIS MATTERS**: The UI process can crash or be killed at any time. The host
/// runs for hours; one bad disconnect must not strand it.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A short read is returned as a frame instead of ending the connection
/// - The accept loop exits on a transport error
/// - The endpoint is not released and re-listened
#[tokio::test]
async fn given_client_dropped_mid_frame_when_new_client_connects_then_served() {
    let (host, config) = start_test_bridge().await;

    // GIVEN: A raw client that announces 100 bytes, sends 10, and disappears
    let mut stream = connect_raw(&config).await;
    stream
        .write_all(&100i32.to_le_bytes())
        .await
        .expect("write header");
    stream.write_all(&[b'x'; 10]).await.expect("write partial");
    stream.flush().await.expect("flush");
    drop(stream);

    // WHEN: A new client connects
    let mut client = connected_client(&config).await;

    // THEN: It is served normally
    let response = client
        .request("ECHO", Some(json!("after drop")))
        .await
        .expect("round trip");
    assert_eq!(response.data, Some(json!("after drop")));
    assert!(host.is_running());

    host.dispose().await;
}

#[tokio::test]
async fn given_negative_frame_length_when_sent_then_connection_closed_and_server_survives() {
    let (host, config) = start_test_bridge().await;

    let mut stream = connect_raw(&config).await;
    stream
        .write_all(&(-5i32).to_le_bytes())
        .await
        .expect("write header");
    stream.flush().await.expect("flush");

    let mut buf = [0u8; 1];
    let read = stream.read(&mut buf).await.unwrap_or(0);
    assert_eq!(read, 0, "server should close the connection");
    drop(stream);

    let mut client = connected_client(&config).await;
    assert!(client.request("ECHO", None).await.expect("round trip").is_success());

    host.dispose().await;
}

#[tokio::test]
async fn given_pipelined_frames_when_written_together_then_answered_in_order() {
    let (host, config) = start_test_bridge().await;
    let mut stream = connect_raw(&config).await;

    let slow = IpcRequest::new("SLOW_ECHO", Some(json!("first")));
    let fast = IpcRequest::new("ECHO", Some(json!("second")));
    write_frame(&mut stream, &slow.to_bytes().expect("encode"))
        .await
        .expect("write");
    write_frame(&mut stream, &fast.to_bytes().expect("encode"))
        .await
        .expect("write");

    let first = read_frame(&mut stream).await.expect("first response");
    let second = read_frame(&mut stream).await.expect("second response");
    let first = IpcResponse::from_bytes(&first).expect("decode");
    let second = IpcResponse::from_bytes(&second).expect("decode");

    assert_eq!(first.message_id, slow.message_id);
    assert_eq!(second.message_id, fast.message_id);

    host.dispose().await;
}

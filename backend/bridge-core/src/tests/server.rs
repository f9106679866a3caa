// Unit tests for response encoding on the server side.

use crate::error::handler::codes;
use crate::ipc::message::{IpcRequest, IpcResponse};
use crate::ipc::server::encode_response;

use serde_json::json;

/// **VALUE**: A response that would not fit in one frame is replaced by a
/// small `ACTION_ERROR` for the same message.
///
/// **BUG THIS CATCHES**: Writing the oversized frame makes the client reject it
/// as a transport error and drop the connection.
#[test]
fn given_response_over_frame_limit_when_encoded_then_action_error_for_same_message() {
    let request = IpcRequest::new("GET_FILE_PREVIEW", None);
    let response = IpcResponse::success(&request, json!({ "Blob": "x".repeat(4096) }));

    let bytes = encode_response(&response, 1024).expect("encode");

    assert!(bytes.len() <= 1024);
    let sent = IpcResponse::from_bytes(&bytes).expect("decode");
    assert_eq!(sent.message_id, request.message_id);
    assert_eq!(sent.action, "GET_FILE_PREVIEW");
    assert_eq!(sent.error_code(), Some(codes::ACTION_ERROR));
}

#[test]
fn given_response_within_limit_when_encoded_then_sent_unchanged() {
    let request = IpcRequest::new("ECHO", None);
    let response = IpcResponse::success(&request, json!({ "Value": 42 }));

    let bytes = encode_response(&response, 64 * 1024).expect("encode");

    assert_eq!(bytes, response.to_bytes().expect("encode directly"));
}

//! Request and response envelopes carried inside frames.
//!
//! Both envelopes serialize with PascalCase keys:
//!
//! ```json
//! {"MessageId":"…","MessageType":"REQUEST","Action":"GET_FILE_PREVIEW",
//!  "Timestamp":"2026-01-01T00:00:00.000Z","Data":{"FilePath":"…"}}
//! ```
//!
//! A response adds `"Error": {"Code","Message","Details"} | null`.

use crate::error::HandlerError;
use crate::error::ipc::IpcError;

use common::ErrorLocation;

use std::panic::Location;
use std::time::SystemTime;

use humantime::format_rfc3339_millis;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Request,
    Response,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpcRequest {
    pub message_id: String,
    pub message_type: MessageType,
    pub action: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpcResponse {
    pub message_id: String,
    pub message_type: MessageType,
    pub action: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<MessageError>,
}

/// A frame that could not be turned into an [`IpcRequest`].
///
/// Carries the best correlation id recovered from the frame (empty when the
/// frame was not even JSON) so an error response can still be sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRequest {
    pub message_id: String,
    pub action: String,
    pub error: HandlerError,
}

impl RejectedRequest {
    fn new(value: Option<&Value>, error: HandlerError) -> Self {
        let field = |name: &str| {
            value
                .and_then(|v| v.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            message_id: field("MessageId"),
            action: field("Action"),
            error,
        }
    }

    pub fn into_response(self) -> IpcResponse {
        IpcResponse::failure(self.message_id, self.action, self.error)
    }
}

/// Current time as an RFC 3339 UTC timestamp with millisecond precision.
pub fn timestamp_now() -> String {
    format_rfc3339_millis(SystemTime::now()).to_string()
}

impl IpcRequest {
    /// Build a request with a fresh correlation id.
    pub fn new(action: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            message_type: MessageType::Request,
            action: action.into(),
            timestamp: timestamp_now(),
            data,
        }
    }

    /// Build a request whose `Data` is the serialized form of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::JsonEncode`] if `payload` cannot be represented as JSON.
    pub fn with_payload<T: Serialize>(
        action: impl Into<String>,
        payload: &T,
    ) -> Result<Self, IpcError> {
        let data = serde_json::to_value(payload).map_err(|e| IpcError::JsonEncode {
            message: format!("Failed to encode request data: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
        Ok(Self::new(action, Some(data)))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, IpcError> {
        encode(self)
    }

    /// Decode and validate a request frame.
    ///
    /// # Errors
    ///
    /// Returns a [`RejectedRequest`] with an `INVALID_REQUEST` error for malformed
    /// JSON, a missing field, a non-`REQUEST` message type or an empty action.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RejectedRequest> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            RejectedRequest::new(
                None,
                HandlerError::invalid_request(format!("Malformed JSON: {e}")),
            )
        })?;

        let request: IpcRequest = match serde_json::from_value(value.clone()) {
            Ok(request) => request,
            Err(e) => {
                return Err(RejectedRequest::new(
                    Some(&value),
                    HandlerError::invalid_request(format!("Invalid request envelope: {e}")),
                ));
            }
        };

        if request.message_type != MessageType::Request {
            return Err(RejectedRequest::new(
                Some(&value),
                HandlerError::invalid_request("MessageType must be REQUEST"),
            ));
        }

        if request.action.trim().is_empty() {
            return Err(RejectedRequest::new(
                Some(&value),
                HandlerError::invalid_request("Action must not be empty"),
            ));
        }

        Ok(request)
    }
}

impl IpcResponse {
    pub fn success(request: &IpcRequest, data: Value) -> Self {
        Self {
            message_id: request.message_id.clone(),
            message_type: MessageType::Response,
            action: request.action.clone(),
            timestamp: timestamp_now(),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(
        message_id: impl Into<String>,
        action: impl Into<String>,
        error: HandlerError,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            message_type: MessageType::Response,
            action: action.into(),
            timestamp: timestamp_now(),
            data: None,
            error: Some(MessageError::from(error)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    /// Decode the `Data` of a successful response into `T`.
    ///
    /// # Errors
    ///
    /// - [`IpcError::Protocol`] if the response carries an error
    /// - [`IpcError::JsonDecode`] if `Data` does not match `T`
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, IpcError> {
        if let Some(error) = &self.error {
            return Err(IpcError::Protocol {
                message: format!(
                    "{} response failed: {}: {}",
                    self.action, error.code, error.message
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let data = self.data.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, IpcError> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IpcError> {
        let response: IpcResponse = serde_json::from_slice(bytes)?;
        if response.message_type != MessageType::Response {
            return Err(IpcError::Protocol {
                message: format!("Expected RESPONSE, got {:?}", response.message_type),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(response)
    }
}

impl From<HandlerError> for MessageError {
    fn from(error: HandlerError) -> Self {
        Self {
            code: error.code,
            message: error.message,
            details: error.details,
        }
    }
}

#[track_caller]
fn encode<T: Serialize>(envelope: &T) -> Result<Vec<u8>, IpcError> {
    let location = ErrorLocation::from(Location::caller());
    serde_json::to_vec(envelope).map_err(|e| IpcError::JsonEncode {
        message: format!("Failed to encode envelope: {e}"),
        location,
    })
}

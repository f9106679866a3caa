use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum IpcError {
    /// The peer closed the stream before a whole frame arrived.
    #[error("Unexpected End Of Stream Error: {message} {location}")]
    UnexpectedEndOfStream {
        message: String,
        location: ErrorLocation,
    },

    /// A frame header that cannot describe a valid payload.
    #[error("Frame Error: {message} {location}")]
    Frame {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        kind: ErrorKind,
        location: ErrorLocation,
    },

    #[error("Endpoint Error: {message} {location}")]
    Endpoint {
        message: String,
        location: ErrorLocation,
    },

    #[error("Json Encode Error: {message} {location}")]
    JsonEncode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Json Decode Error: {message} {location}")]
    JsonDecode {
        message: String,
        location: ErrorLocation,
    },

    /// A well-formed frame that violates the request/response protocol.
    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connect Failed Error: {message} {location}")]
    ConnectFailed {
        message: String,
        attempts: u32,
        location: ErrorLocation,
    },

    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Runtime Error: {message} {location}")]
    Runtime {
        message: String,
        location: ErrorLocation,
    },
}

impl IpcError {
    /// True when the error means the connection can no longer carry frames.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            IpcError::UnexpectedEndOfStream { .. }
                | IpcError::Frame { .. }
                | IpcError::Io { .. }
                | IpcError::Endpoint { .. }
        )
    }
}

impl From<IoError> for IpcError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        if error.kind() == ErrorKind::UnexpectedEof {
            return IpcError::UnexpectedEndOfStream {
                message: error.to_string(),
                location,
            };
        }

        IpcError::Io {
            message: error.to_string(),
            kind: error.kind(),
            location,
        }
    }
}

impl From<serde_json::Error> for IpcError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        IpcError::JsonDecode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

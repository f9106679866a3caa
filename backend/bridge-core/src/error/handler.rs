//! Business-level failures raised by action handlers.
//!
//! A [`HandlerError`] never tears down a connection. The dispatch table turns it
//! into the `Error` object of the response envelope, keeping the code, message
//! and details exactly as the handler produced them.

use std::fmt::Display;

use thiserror::Error as ThisError;

/// Well-known response error codes.
pub mod codes {
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const UNKNOWN_ACTION: &str = "UNKNOWN_ACTION";
    pub const ACTION_ERROR: &str = "ACTION_ERROR";
    pub const DIRECTORY_NOT_FOUND: &str = "DIRECTORY_NOT_FOUND";
    pub const BLOCK_NOT_FOUND: &str = "BLOCK_NOT_FOUND";
    pub const COMMAND_TIMEOUT: &str = "COMMAND_TIMEOUT";
    pub const HOST_BUSY: &str = "HOST_BUSY";
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{code}: {message}")]
pub struct HandlerError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl HandlerError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }

    pub fn unknown_action(action: &str) -> Self {
        Self::new(codes::UNKNOWN_ACTION, format!("Unknown action: {action}"))
    }

    /// Generic handler failure, used when a handler panics or reports an untyped error.
    pub fn action_error(message: impl Display) -> Self {
        Self::new(codes::ACTION_ERROR, message.to_string())
    }

    pub fn directory_not_found(path: impl Display) -> Self {
        Self::new(
            codes::DIRECTORY_NOT_FOUND,
            format!("Directory not found: {path}"),
        )
    }

    pub fn block_not_found(path: impl Display) -> Self {
        Self::new(codes::BLOCK_NOT_FOUND, format!("Block not found: {path}"))
    }

    pub fn command_timeout(command: &str, timeout_ms: u64) -> Self {
        Self::new(
            codes::COMMAND_TIMEOUT,
            format!("Command did not complete within {timeout_ms} ms: {command}"),
        )
    }

    pub fn host_busy(message: impl Into<String>) -> Self {
        Self::new(codes::HOST_BUSY, message)
    }
}

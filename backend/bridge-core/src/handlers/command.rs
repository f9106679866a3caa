//! `EXECUTE_COMMAND`: run a CAD command line in the host.

use crate::error::HandlerError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::time::timeout as TokioTimeout;

/// `Data` of an `EXECUTE_COMMAND` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecuteCommandRequest {
    pub command: String,
}

/// What the host reports back for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub is_success: bool,
    pub message: Option<String>,
}

impl CommandOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            is_success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecuteCommandResult {
    pub command: String,
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub elapsed_milliseconds: u64,
}

/// Host side of `EXECUTE_COMMAND`.
///
/// Called on a blocking thread. Return `HOST_BUSY` when the host cannot take
/// a command right now; other errors are passed through to the client.
pub trait CommandExecutor: Send + Sync + 'static {
    fn execute(&self, command: &str) -> Result<CommandOutcome, HandlerError>;
}

/// Run `request` on a blocking thread, bounded by `limit`.
///
/// On timeout the client gets `COMMAND_TIMEOUT`; the host call itself cannot
/// be interrupted and runs to completion in the background.
pub(crate) async fn execute_command(
    executor: Arc<dyn CommandExecutor>,
    request: ExecuteCommandRequest,
    limit: Duration,
) -> Result<ExecuteCommandResult, HandlerError> {
    let command = request.command.trim().to_string();
    if command.is_empty() {
        return Err(HandlerError::invalid_request("Command must not be empty"));
    }

    debug!("Executing command: {command}");
    let started = Instant::now();

    let call = {
        let command = command.clone();
        tokio::task::spawn_blocking(move || executor.execute(&command))
    };

    let outcome = match TokioTimeout(limit, call).await {
        Ok(Ok(outcome)) => outcome?,
        Ok(Err(join_error)) => {
            return Err(HandlerError::action_error(format!(
                "Command executor failed: {join_error}"
            )));
        }
        Err(_) => {
            warn!("Command timed out after {limit:?}: {command}");
            let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            return Err(HandlerError::command_timeout(&command, timeout_ms));
        }
    };

    Ok(ExecuteCommandResult {
        command,
        is_success: outcome.is_success,
        message: outcome.message,
        elapsed_milliseconds: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

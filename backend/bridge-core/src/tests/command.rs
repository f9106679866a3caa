// Unit tests for EXECUTE_COMMAND through the dispatch table.

use crate::config::LibraryConfig;
use crate::error::HandlerError;
use crate::error::handler::codes;
use crate::handlers::{
    BlockLibraryHandlers, CommandExecutor, CommandOutcome, ExecuteCommandResult, actions,
};
use crate::ipc::dispatch::DispatchTable;
use crate::ipc::message::IpcRequest;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::json;

#[derive(Default)]
struct RecordingExecutor {
    executed: Mutex<Vec<String>>,
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, command: &str) -> Result<CommandOutcome, HandlerError> {
        match command {
            "BUSY" => Err(HandlerError::host_busy("Another command is running")),
            "SLOW" => {
                thread::sleep(Duration::from_millis(500));
                Ok(CommandOutcome::succeeded("late"))
            }
            "BAD" => Ok(CommandOutcome::failed("Unknown command")),
            _ => {
                self.executed
                    .lock()
                    .expect("lock")
                    .push(command.to_string());
                Ok(CommandOutcome::succeeded(format!("{command} done")))
            }
        }
    }
}

fn table(executor: Arc<RecordingExecutor>, timeout_ms: u64) -> DispatchTable {
    let library = LibraryConfig {
        command_timeout_ms: timeout_ms,
        ..LibraryConfig::default()
    };
    let mut table = DispatchTable::new();
    BlockLibraryHandlers::new(&library)
        .with_command_executor(executor)
        .register(&mut table);
    table
}

fn command(text: &str) -> IpcRequest {
    IpcRequest::new(actions::EXECUTE_COMMAND, Some(json!({ "Command": text })))
}

#[tokio::test]
async fn given_command_when_executed_then_result_reports_outcome_and_timing() {
    let executor = Arc::new(RecordingExecutor::default());
    let table = table(Arc::clone(&executor), 5_000);

    let response = table.dispatch(&command("  ZOOM E  ")).await;
    let result: ExecuteCommandResult = response.data_as().expect("success");

    assert_eq!(result.command, "ZOOM E");
    assert!(result.is_success);
    assert_eq!(result.message.as_deref(), Some("ZOOM E done"));
    assert_eq!(*executor.executed.lock().expect("lock"), vec!["ZOOM E"]);
}

#[tokio::test]
async fn given_host_rejects_command_when_executed_then_result_not_success() {
    let table = table(Arc::new(RecordingExecutor::default()), 5_000);

    let result: ExecuteCommandResult = table
        .dispatch(&command("BAD"))
        .await
        .data_as()
        .expect("still a success response");
    assert!(!result.is_success);
}

#[tokio::test]
async fn given_busy_host_when_executed_then_host_busy_error() {
    let table = table(Arc::new(RecordingExecutor::default()), 5_000);

    let response = table.dispatch(&command("BUSY")).await;
    assert_eq!(response.error_code(), Some(codes::HOST_BUSY));
}

/// **VALUE**: Verifies a hung host call is answered with `COMMAND_TIMEOUT`.
///
/// **WHY THIS MATTERS**: The UI blocks on the response; a command that never
/// returns would otherwise freeze the palette.
#[tokio::test]
async fn given_slow_command_when_timeout_elapses_then_command_timeout_error() {
    let table = table(Arc::new(RecordingExecutor::default()), 50);

    let response = table.dispatch(&command("SLOW")).await;
    assert_eq!(response.error_code(), Some(codes::COMMAND_TIMEOUT));
}

#[tokio::test]
async fn given_empty_command_when_executed_then_invalid_request() {
    let executor = Arc::new(RecordingExecutor::default());
    let table = table(Arc::clone(&executor), 5_000);

    let response = table.dispatch(&command("   ")).await;
    assert_eq!(response.error_code(), Some(codes::INVALID_REQUEST));
    assert!(executor.executed.lock().expect("lock").is_empty());
}

#[test]
fn given_only_command_executor_when_registered_then_other_actions_absent() {
    let table = table(Arc::new(RecordingExecutor::default()), 5_000);

    assert_eq!(table.actions(), vec![actions::EXECUTE_COMMAND]);
}

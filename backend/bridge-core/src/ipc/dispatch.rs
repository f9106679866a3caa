//! Action-to-handler registry.
//!
//! The table is filled once by the host's composition root and then shared
//! read-only with the serve loop. Handlers only see decoded `Data` and answer
//! with a JSON value or a [`HandlerError`]; they never touch the wire format.
//!
//! Every outcome of [`DispatchTable::dispatch`] is a response envelope:
//!
//! - unknown action → `UNKNOWN_ACTION`
//! - handler error → the handler's own code, message and details
//! - handler panic → `ACTION_ERROR` carrying the panic message

use crate::error::HandlerError;
use crate::ipc::message::{IpcRequest, IpcResponse};

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use log::{debug, error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub type HandlerResult = Result<Value, HandlerError>;
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;
pub type HandlerFn = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

#[derive(Default, Clone)]
pub struct DispatchTable {
    handlers: HashMap<String, HandlerFn>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `action`, replacing any previous registration.
    ///
    /// `handler` receives the request's `Data` (`Value::Null` when absent).
    pub fn register_handler<F, Fut>(
        &mut self,
        action: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let action = action.into();
        let handler: HandlerFn = Arc::new(move |data| -> HandlerFuture { Box::pin(handler(data)) });
        if self.handlers.insert(action.clone(), handler).is_some() {
            warn!("Replaced handler for action {action}");
        } else {
            debug!("Registered handler for action {action}");
        }
        self
    }

    /// Register a handler with typed input and output.
    ///
    /// `Data` that does not decode into `Req` is answered with `INVALID_REQUEST`
    /// before the handler runs.
    pub fn register_typed<Req, Res, F, Fut>(
        &mut self,
        action: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, HandlerError>> + Send + 'static,
    {
        let action = action.into();
        let label = action.clone();
        let handler = Arc::new(handler);

        self.register_handler(action, move |data: Value| {
            let handler = Arc::clone(&handler);
            let label = label.clone();
            async move {
                let request: Req = serde_json::from_value(data).map_err(|e| {
                    HandlerError::invalid_request(format!("Invalid {label} payload: {e}"))
                })?;
                let result = handler(request).await?;
                serde_json::to_value(result).map_err(|e| {
                    HandlerError::action_error(format!("Failed to encode {label} result: {e}"))
                })
            }
        })
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered actions in sorted order.
    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        actions.sort_unstable();
        actions
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Decode one request frame and dispatch it.
    ///
    /// Frames that are not a valid request are answered with `INVALID_REQUEST`,
    /// echoing whatever `MessageId` could be recovered.
    pub async fn dispatch_frame(&self, frame: &[u8]) -> IpcResponse {
        match IpcRequest::from_bytes(frame) {
            Ok(request) => {
                debug!(
                    "Dispatching {} (message {})",
                    request.action, request.message_id
                );
                self.dispatch(&request).await
            }
            Err(rejected) => {
                warn!(
                    "Rejected frame (message '{}'): {}",
                    rejected.message_id, rejected.error.message
                );
                rejected.into_response()
            }
        }
    }

    /// Run the handler for `request` and wrap its outcome in a response.
    pub async fn dispatch(&self, request: &IpcRequest) -> IpcResponse {
        let Some(handler) = self.handlers.get(&request.action) else {
            warn!("No handler registered for action {}", request.action);
            return IpcResponse::failure(
                &request.message_id,
                &request.action,
                HandlerError::unknown_action(&request.action),
            );
        };

        let data = request.data.clone().unwrap_or(Value::Null);
        let handler = Arc::clone(handler);

        // The call itself happens inside the guarded future so a panic while
        // building the future is caught too.
        let outcome = AssertUnwindSafe(async move { handler(data).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(data)) => IpcResponse::success(request, data),
            Ok(Err(handler_error)) => {
                warn!(
                    "Action {} failed ({}): {}",
                    request.action, handler_error.code, handler_error.message
                );
                IpcResponse::failure(&request.message_id, &request.action, handler_error)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Handler for {} panicked: {message}", request.action);
                IpcResponse::failure(
                    &request.message_id,
                    &request.action,
                    HandlerError::action_error(message),
                )
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Handler panicked".to_string()
    }
}

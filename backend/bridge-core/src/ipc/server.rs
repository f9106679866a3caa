//! IPC server: accept loop and per-connection serve loop.
//!
//! The server:
//!
//! - Binds one named local endpoint (no network exposure)
//! - Serves exactly one client at a time, requests strictly in arrival order
//! - Answers every decoded frame, including malformed ones, with a response
//! - Survives transport failures by returning to the listening state
//!
//! # Lifecycle
//!
//! [`IpcServer::start`] spawns the accept loop on a background tokio task and
//! returns immediately. [`IpcServer::stop`] raises the shared cancellation
//! signal, which every suspension point (accept, frame read, handler await)
//! races against, then joins the task within the configured bound.

use crate::config::{BridgeConfig, PipeConfig, ServerSettings};
use crate::error::HandlerError;
use crate::error::ipc::IpcError;
use crate::ipc::connection_state::ConnectionState;
use crate::ipc::dispatch::DispatchTable;
use crate::ipc::endpoint::{BoxedStream, PipeListener, endpoint_path};
use crate::ipc::frame::{read_frame_limited, write_frame};
use crate::ipc::message::IpcResponse;
use crate::ipc::state::ServerState;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};

/// IPC server bound to one channel name and one dispatch table.
pub struct IpcServer {
    inner: Arc<ServerInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct ServerInner {
    pipe: PipeConfig,
    settings: ServerSettings,
    dispatch: Arc<DispatchTable>,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    state_tx: watch::Sender<ServerState>,
}

impl ServerInner {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ServerState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("IPC server {}: {previous} -> {state}", self.pipe.name);
        }
    }
}

impl IpcServer {
    pub fn new(pipe: PipeConfig, settings: ServerSettings, dispatch: DispatchTable) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(ServerState::Idle);

        Self {
            inner: Arc::new(ServerInner {
                pipe,
                settings,
                dispatch: Arc::new(dispatch),
                running: AtomicBool::new(false),
                shutdown_tx,
                state_tx,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn from_config(config: &BridgeConfig, dispatch: DispatchTable) -> Self {
        Self::new(config.pipe.clone(), config.server, dispatch)
    }

    pub fn pipe_name(&self) -> &str {
        &self.inner.pipe.name
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn state(&self) -> ServerState {
        *self.inner.state_tx.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
        self.inner.state_tx.subscribe()
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.inner.dispatch
    }

    /// Start the accept loop in the background. No-op when already running.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Runtime`] when called outside a tokio runtime.
    pub fn start(&self) -> Result<(), IpcError> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            debug!("IPC server {} already running", self.pipe_name());
            return Ok(());
        }

        let runtime = match RuntimeHandle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.inner.running.store(false, Ordering::SeqCst);
                return Err(IpcError::Runtime {
                    message: format!("IPC server needs a tokio runtime: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        self.inner.shutdown_tx.send_replace(false);
        let task = runtime.spawn(accept_loop(Arc::clone(&self.inner)));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        info!(
            "IPC server started on {} ({} actions registered)",
            endpoint_path(self.pipe_name()).display(),
            self.inner.dispatch.len()
        );
        Ok(())
    }

    /// Stop the server and wait for the background task. No-op when not running.
    ///
    /// The task gets `server.stop_timeout_ms` to wind down before it is aborted.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            debug!("IPC server {} not running", self.pipe_name());
            return;
        }

        info!("Stopping IPC server {}", self.pipe_name());
        self.inner.shutdown_tx.send_replace(true);

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(mut task) = task {
            let limit = self.inner.settings.stop_timeout();
            match TokioTimeout(limit, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_panic() => error!("IPC accept loop panicked: {e}"),
                Ok(Err(_)) => {}
                Err(_) => {
                    warn!("IPC accept loop did not stop within {limit:?}, aborting");
                    task.abort();
                }
            }
        }

        self.inner.set_state(ServerState::Stopped);
        info!("IPC server {} stopped", self.pipe_name());
    }

    /// Synchronous teardown for `Drop`: signal, abort, do not wait.
    pub(crate) fn abort(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.inner.shutdown_tx.send_replace(true);
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.inner.set_state(ServerState::Stopped);
        warn!("IPC server {} aborted without a graceful stop", self.pipe_name());
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Bind, accept one client, serve it, repeat until stopped.
async fn accept_loop(inner: Arc<ServerInner>) {
    let mut shutdown = inner.shutdown_tx.subscribe();
    let retry_delay = inner.settings.accept_retry_delay();

    while inner.is_running() {
        let mut listener = match PipeListener::bind(&inner.pipe.name).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind IPC endpoint {}: {e}", inner.pipe.name);
                if !pause(&mut shutdown, retry_delay).await {
                    break;
                }
                continue;
            }
        };

        info!("IPC server listening on {}", listener.name());

        while inner.is_running() {
            inner.set_state(ServerState::Listening);

            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown.wait_for(|stop| *stop) => break,
            };

            match accepted {
                Ok(stream) => {
                    inner.set_state(ServerState::Connected);
                    serve_connection(&inner, stream, &mut shutdown).await;
                }
                Err(e) => {
                    error!("Failed to accept IPC client: {e}");
                    break;
                }
            }
        }

        // Release the endpoint before rebinding or exiting.
        drop(listener);

        if inner.is_running() && !pause(&mut shutdown, retry_delay).await {
            break;
        }
    }

    inner.set_state(ServerState::Stopped);
    info!("IPC accept loop for {} exited", inner.pipe.name);
}

/// Sleep for `delay` unless shutdown is signalled first. Returns `false` on shutdown.
async fn pause(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = TokioSleep(delay) => true,
        _ = shutdown.wait_for(|stop| *stop) => false,
    }
}

/// Run the serve loop for one client and log how it ended.
async fn serve_connection(
    inner: &ServerInner,
    mut stream: BoxedStream,
    shutdown: &mut watch::Receiver<bool>,
) {
    let mut connection = ConnectionState::new();
    info!("IPC client connected (connection {})", connection.id());

    let outcome = serve_requests(inner, &mut stream, &mut connection, shutdown).await;

    match outcome {
        Ok(()) => info!(
            "IPC connection {} closed by server after {} requests",
            connection.id(),
            connection.requests()
        ),
        Err(IpcError::UnexpectedEndOfStream { .. }) => info!(
            "IPC client disconnected (connection {}, {} requests, {} failed, up {:?})",
            connection.id(),
            connection.requests(),
            connection.failed_requests(),
            connection.uptime()
        ),
        Err(e) => error!(
            "IPC connection {} terminated by transport error: {e}",
            connection.id()
        ),
    }
}

/// Read → dispatch → write until the peer leaves, transport breaks or shutdown.
async fn serve_requests(
    inner: &ServerInner,
    stream: &mut BoxedStream,
    connection: &mut ConnectionState,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), IpcError> {
    let max_frame = Some(inner.pipe.max_frame_bytes);

    while inner.is_running() {
        let frame = tokio::select! {
            frame = read_frame_limited(stream, max_frame) => frame?,
            _ = shutdown.wait_for(|stop| *stop) => return Ok(()),
        };

        let response = tokio::select! {
            response = inner.dispatch.dispatch_frame(&frame) => response,
            _ = shutdown.wait_for(|stop| *stop) => return Ok(()),
        };

        let bytes = encode_response(&response, inner.pipe.max_frame_bytes)?;
        write_frame(stream, &bytes).await?;
        connection.record(response.is_success());
    }

    Ok(())
}

/// Encode a response, falling back to an `ACTION_ERROR` envelope if the
/// handler's data cannot be serialized or would not fit in one frame, so the
/// client is never left waiting and never sees an oversized frame.
pub(crate) fn encode_response(
    response: &IpcResponse,
    max_frame_bytes: usize,
) -> Result<Vec<u8>, IpcError> {
    let failure = match response.to_bytes() {
        Ok(bytes) if bytes.len() <= max_frame_bytes => return Ok(bytes),
        Ok(bytes) => {
            warn!(
                "Response for {} is {} bytes, over the {max_frame_bytes} byte frame limit",
                response.action,
                bytes.len()
            );
            HandlerError::action_error(format!(
                "Response of {} bytes exceeds the {max_frame_bytes} byte frame limit",
                bytes.len()
            ))
        }
        Err(e) => {
            error!("Failed to encode response for {}: {e}", response.action);
            HandlerError::action_error(format!("Failed to encode response: {e}"))
        }
    };

    IpcResponse::failure(&response.message_id, &response.action, failure).to_bytes()
}

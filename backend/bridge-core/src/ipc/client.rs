//! Client side of the bridge: connect with bounded retries, then synchronous
//! request/response round trips.
//!
//! A client owns at most one connection. [`IpcClient::send_request`] takes
//! `&mut self`, so a second request cannot be issued on the same connection
//! until the first one's response has been read.

use crate::config::{BridgeConfig, ClientSettings, PipeConfig};
use crate::error::ipc::IpcError;
use crate::ipc::endpoint::{self, BoxedStream, endpoint_path};
use crate::ipc::frame::{read_frame_limited, write_frame};
use crate::ipc::message::{IpcRequest, IpcResponse};

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use log::{debug, info, trace, warn};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};

const MAX_BACKOFF_INTERVAL: Duration = Duration::from_secs(30);

pub struct IpcClient {
    pipe: PipeConfig,
    settings: ClientSettings,
    stream: Option<BoxedStream>,
}

impl IpcClient {
    pub fn new(pipe: PipeConfig, settings: ClientSettings) -> Self {
        Self {
            pipe,
            settings,
            stream: None,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.pipe.clone(), config.client)
    }

    pub fn pipe_name(&self) -> &str {
        &self.pipe.name
    }

    /// Whether the pipe is open right now.
    ///
    /// Checks the stream itself, so a server that went away since the last
    /// round trip shows up here without sending anything.
    pub fn is_connected(&self) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|stream| !stream.peer_closed())
    }

    /// Connect with per-attempt timeouts and exponential backoff between attempts.
    ///
    /// No-op if the current connection is still open; a connection the server
    /// has closed is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::ConnectFailed`] once the attempt budget is exhausted.
    pub async fn connect(&mut self) -> Result<(), IpcError> {
        if self.is_connected() {
            debug!("Already connected to {}", self.pipe.name);
            return Ok(());
        }

        let attempts = self.settings.max_connect_attempts.max(1);
        let mut backoff = self.backoff_policy();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            debug!(
                "Connecting to {} (attempt {attempt}/{attempts})",
                self.pipe.name
            );

            let connect = endpoint::connect(&self.pipe.name);
            match TokioTimeout(self.settings.connect_timeout(), connect).await {
                Ok(Ok(stream)) => {
                    info!("Connected to {} on attempt {attempt}", self.pipe.name);
                    self.stream = Some(stream);
                    return Ok(());
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.settings.connect_timeout());
                }
            }

            if attempt < attempts {
                let delay = backoff
                    .next_backoff()
                    .unwrap_or_else(|| self.settings.initial_backoff());
                warn!(
                    "Connect attempt {attempt}/{attempts} to {} failed ({last_error}), retrying in {delay:?}",
                    self.pipe.name
                );
                TokioSleep(delay).await;
            }
        }

        Err(IpcError::ConnectFailed {
            message: format!(
                "Could not connect to '{}' ({}) after {attempts} attempts: {last_error}. \
                 Check that the host application is running, that the bridge handler is \
                 registered in the host, and that the server has been started.",
                self.pipe.name,
                endpoint_path(&self.pipe.name).display()
            ),
            attempts,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Send one request and wait for its response.
    ///
    /// # Errors
    ///
    /// - [`IpcError::NotConnected`] without touching the pipe if not connected
    /// - transport errors, after which the connection is dropped
    /// - [`IpcError::Protocol`] if the response is for a different message
    pub async fn send_request(&mut self, request: &IpcRequest) -> Result<IpcResponse, IpcError> {
        let max_frame = Some(self.pipe.max_frame_bytes);
        let Some(stream) = self.stream.as_mut() else {
            return Err(IpcError::NotConnected {
                message: format!(
                    "Cannot send {} before connecting to {}",
                    request.action, self.pipe.name
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let bytes = request.to_bytes()?;
        trace!("Sending {} ({} bytes)", request.action, bytes.len());

        let round_trip = async {
            write_frame(stream, &bytes).await?;
            read_frame_limited(stream, max_frame).await
        };

        let frame = match round_trip.await {
            Ok(frame) => frame,
            Err(e) => {
                if e.is_transport() {
                    warn!("Connection to {} lost: {e}", self.pipe.name);
                    self.stream = None;
                }
                return Err(e);
            }
        };

        let response = IpcResponse::from_bytes(&frame)?;
        if response.message_id != request.message_id {
            return Err(IpcError::Protocol {
                message: format!(
                    "Response id '{}' does not match request id '{}'",
                    response.message_id, request.message_id
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(response)
    }

    /// Build a request for `action` with a fresh id and send it.
    pub async fn request(
        &mut self,
        action: &str,
        data: Option<Value>,
    ) -> Result<IpcResponse, IpcError> {
        let request = IpcRequest::new(action, data);
        self.send_request(&request).await
    }

    /// Close the connection if open. Idempotent.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Error shutting down connection to {}: {e}", self.pipe.name);
            }
            info!("Disconnected from {}", self.pipe.name);
        }
    }

    fn backoff_policy(&self) -> ExponentialBackoff {
        let initial = self.settings.initial_backoff();
        ExponentialBackoff {
            initial_interval: initial,
            current_interval: initial,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: MAX_BACKOFF_INTERVAL.max(initial),
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

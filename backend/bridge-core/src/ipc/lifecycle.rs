//! Lifecycle controller for a running bridge.
//!
//! [`BridgeHost`] owns the [`IpcServer`] and ties its lifetime to the host
//! process: `dispose` always stops the server before releasing anything else,
//! and dropping an undisposed host still cancels the background task.

use crate::config::BridgeConfig;
use crate::error::ipc::IpcError;
use crate::ipc::dispatch::DispatchTable;
use crate::ipc::server::IpcServer;
use crate::ipc::state::ServerState;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use tokio::sync::watch;

pub struct BridgeHost {
    server: IpcServer,
    disposed: AtomicBool,
}

impl BridgeHost {
    pub fn new(server: IpcServer) -> Self {
        Self {
            server,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &BridgeConfig, dispatch: DispatchTable) -> Self {
        Self::new(IpcServer::from_config(config, dispatch))
    }

    /// Start serving. No-op if already running.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Runtime`] if called outside a tokio runtime or after
    /// the host was disposed.
    pub fn start(&self) -> Result<(), IpcError> {
        if self.is_disposed() {
            return Err(IpcError::Runtime {
                message: format!("Bridge {} was already disposed", self.server.pipe_name()),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.server.start()
    }

    pub async fn stop(&self) {
        self.server.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.server.is_running()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ServerState {
        self.server.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
        self.server.subscribe_state()
    }

    pub fn server(&self) -> &IpcServer {
        &self.server
    }

    /// Stop the server, then flush the log sink. Safe to call more than once.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            debug!("Bridge {} already disposed", self.server.pipe_name());
            return;
        }

        self.server.stop().await;
        info!("Bridge {} disposed", self.server.pipe_name());
        log::logger().flush();
    }
}

impl Drop for BridgeHost {
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.server.abort();
            log::logger().flush();
        }
    }
}

use bridge_core::error::CoreError;
use bridge_core::error::config::ConfigError;
use bridge_core::error::ipc::IpcError;

use common::ErrorLocation;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the host and client binaries.
///
/// Serializable so the client binary can print a failure as JSON alongside
/// the responses it prints on success.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum HostError {
    /// Startup and process-level failures (directories, signals, logging)
    #[error("Host Error: {message} {location}")]
    Host {
        message: String,
        location: ErrorLocation,
    },

    /// `bridge.json` could not be loaded
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Transport, endpoint or protocol failure from the bridge
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for HostError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        HostError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IpcError> for HostError {
    #[track_caller]
    fn from(error: IpcError) -> Self {
        HostError::Bridge {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CoreError> for HostError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Config(e) => HostError::from(e),
            CoreError::Ipc(e) => HostError::from(e),
        }
    }
}

//! Where the host keeps its configuration and logs.
//!
//! Both directories can be overridden from the environment (or a `.env` file
//! loaded by the binaries), which is how tests and portable installs point the
//! host somewhere else.

use crate::error::HostError;

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "block-library-bridge";
pub const CONFIG_DIR_ENV: &str = "BLOCK_LIBRARY_CONFIG_DIR";
pub const LOG_DIR_ENV: &str = "BLOCK_LIBRARY_LOG_DIR";

/// `$BLOCK_LIBRARY_CONFIG_DIR`, else `<config dir>/block-library-bridge`.
#[track_caller]
pub fn config_dir() -> Result<PathBuf, HostError> {
    resolve(CONFIG_DIR_ENV, dirs::config_dir(), None)
}

/// `$BLOCK_LIBRARY_LOG_DIR`, else `<local data dir>/block-library-bridge/logs`.
#[track_caller]
pub fn log_dir() -> Result<PathBuf, HostError> {
    resolve(LOG_DIR_ENV, dirs::data_local_dir(), Some("logs"))
}

#[track_caller]
fn resolve(
    variable: &str,
    platform_dir: Option<PathBuf>,
    leaf: Option<&str>,
) -> Result<PathBuf, HostError> {
    if let Some(dir) = env::var_os(variable).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let base = platform_dir.ok_or_else(|| HostError::Host {
        message: format!("No platform directory available; set {variable}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let dir = base.join(APP_DIR_NAME);
    Ok(match leaf {
        Some(leaf) => dir.join(leaf),
        None => dir,
    })
}

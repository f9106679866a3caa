//! Logging for the bridge host.
//!
//! The console gets short coloured lines; `block-library-host.log` gets the
//! full record (target and source position) for support requests.

use crate::error::HostError;

use common::ErrorLocation;

use std::env;
use std::io::stdout;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339_millis;
use log::{LevelFilter, info, warn};

/// Set by the first call to [`initialize`], whether or not it succeeded.
static INITIALIZE_ATTEMPTED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "block-library-host.log";

/// Overrides the build default, e.g. `BLOCK_LIBRARY_LOG_LEVEL=trace`.
pub const LOG_LEVEL_ENV: &str = "BLOCK_LIBRARY_LOG_LEVEL";

#[cfg(debug_assertions)]
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Level from [`LOG_LEVEL_ENV`], falling back to the build default when unset or invalid.
pub fn configured_level() -> LevelFilter {
    env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|level| LevelFilter::from_str(level.trim()).ok())
        .unwrap_or(DEFAULT_LEVEL)
}

/// Install the global logger for the process.
///
/// Only the first call does anything; later calls warn and return `Ok`, even
/// if the first one failed.
///
/// # Errors
///
/// Returns [`HostError::Host`] if the log file cannot be opened or another
/// logger is already installed.
pub fn initialize(log_dir: &Path) -> Result<(), HostError> {
    if INITIALIZE_ATTEMPTED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized, ignoring {}", log_dir.display());
        return Ok(());
    }

    let level = configured_level();
    install(log_dir, level)?;
    info!("Logging at {level:?} to {}", log_file_path(log_dir).display());
    Ok(())
}

#[track_caller]
fn install(log_dir: &Path, level: LevelFilter) -> Result<(), HostError> {
    let path = log_file_path(log_dir);
    let log_file = fern::log_file(&path).map_err(|e| HostError::Host {
        message: format!("Failed to create log file {}: {e}", path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let colors = ColoredLevelConfig::new()
        .trace(Magenta)
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red);

    let console = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {message}",
                format_rfc3339_millis(SystemTime::now()),
                colors.color(record.level()),
            ))
        })
        .chain(stdout());

    let file = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {message} [{}:{}]",
                format_rfc3339_millis(SystemTime::now()),
                record.level(),
                record.target(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
            ))
        })
        .chain(log_file);

    Dispatch::new()
        .level(level)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(|e| HostError::Host {
            message: format!("Failed to install logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}

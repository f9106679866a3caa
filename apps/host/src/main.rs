use block_library_host::cli::unreadable_env_file;
use block_library_host::composition::start_bridge;
use block_library_host::error::HostError;
use block_library_host::logger::initialize as LoggerInitialize;
use block_library_host::paths;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use log::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), HostError> {
    let env_file = dotenvy::dotenv();

    let log_dir = paths::log_dir()?;
    create_dir_all(&log_dir).map_err(|e| HostError::Host {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Logger first, so everything after this point is recorded.
    LoggerInitialize(&log_dir)?;

    info!("Block library host starting");
    if let Ok(path) = &env_file {
        info!("Loaded environment from {}", path.display());
    }
    if let Some(e) = unreadable_env_file(&env_file) {
        warn!("Ignoring unreadable .env file: {e}");
    }

    let config_dir = paths::config_dir()?;
    info!("Config directory: {}", config_dir.display());

    let (bridge, config) = start_bridge(&config_dir)?;
    info!("Listening on {}; press Ctrl-C to stop", config.pipe.name);

    let signal = tokio::signal::ctrl_c().await;

    bridge.dispose().await;

    signal.map_err(|e| HostError::Host {
        message: format!("Failed to wait for Ctrl-C: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    info!("Block library host stopped");
    Ok(())
}

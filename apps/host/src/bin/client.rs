//! One-shot bridge client.
//!
//! ```text
//! block-library-client <ACTION> [DATA_JSON]
//! block-library-client GET_BLOCK_LIBRARY_TREE '{"RootPath":"C:/Blocks"}'
//! ```
//!
//! Prints the response envelope as JSON on stdout. Exits 1 when the response
//! carries an error and 2 when no response could be obtained. Bad arguments
//! are reported by clap with its own exit code.

use block_library_host::cli::{ClientArgs, unreadable_env_file};
use block_library_host::error::HostError;
use block_library_host::paths;

use bridge_core::config::BridgeConfig;
use bridge_core::ipc::IpcClient;

use common::ErrorLocation;

use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let env_file = dotenvy::dotenv();
    let args = ClientArgs::parse();

    if let Some(e) = unreadable_env_file(&env_file) {
        eprintln!("Ignoring unreadable .env file: {e}");
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            let rendered = serde_json::to_string_pretty(&e).unwrap_or_else(|_| e.to_string());
            eprintln!("{rendered}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the response was a success.
async fn run(args: ClientArgs) -> Result<bool, HostError> {
    let config = BridgeConfig::load(&paths::config_dir()?)?;
    let mut client = IpcClient::from_config(&config);
    client.connect().await?;

    let response = client.request(&args.action, args.data).await;
    client.disconnect().await;
    let response = response?;

    let rendered = serde_json::to_string_pretty(&response).map_err(|e| HostError::Bridge {
        message: format!("Failed to render response: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;
    println!("{rendered}");

    Ok(response.is_success())
}

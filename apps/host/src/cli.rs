//! Command-line arguments of the one-shot `block-library-client`, and the
//! `.env` check both binaries share.

use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "block-library-client")]
#[command(version, about = "Send one request to a running block library host", long_about = None)]
pub struct ClientArgs {
    /// Action name, e.g. GET_BLOCK_LIBRARY_TREE
    #[arg(value_name = "ACTION")]
    pub action: String,

    /// Request data as a JSON document
    #[arg(value_name = "DATA_JSON", value_parser = parse_data_json)]
    pub data: Option<Value>,
}

/// `value_parser` for `DATA_JSON`.
pub fn parse_data_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("not valid JSON: {e}"))
}

/// The `.env` load error worth reporting; a missing file is not one.
pub fn unreadable_env_file(loaded: &dotenvy::Result<PathBuf>) -> Option<&dotenvy::Error> {
    match loaded {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}

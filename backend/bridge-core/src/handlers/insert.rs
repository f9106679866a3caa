//! `INSERT_BLOCK`: place a block file into the active drawing.

use crate::error::HandlerError;

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// `Data` of an `INSERT_BLOCK` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InsertBlockRequest {
    pub block_path: PathBuf,
    /// Defaults to the file stem of `BlockPath` when empty.
    #[serde(default)]
    pub block_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl InsertBlockRequest {
    pub fn scale(&self) -> f64 {
        self.scale.unwrap_or(1.0)
    }

    pub fn rotation(&self) -> f64 {
        self.rotation.unwrap_or(0.0)
    }

    pub fn placement(&self) -> Placement {
        self.placement.unwrap_or_default()
    }
}

/// Host side of `INSERT_BLOCK`. Called on a blocking thread with a request
/// whose path exists and whose name is filled in.
///
/// `Ok(false)` means the host declined the insertion (e.g. the user cancelled).
pub trait BlockInserter: Send + Sync + 'static {
    fn insert_block(&self, request: &InsertBlockRequest) -> Result<bool, HandlerError>;
}

pub(crate) async fn insert_block(
    inserter: Arc<dyn BlockInserter>,
    request: InsertBlockRequest,
) -> Result<bool, HandlerError> {
    if request.block_path.as_os_str().is_empty() {
        return Err(HandlerError::invalid_request("BlockPath must not be empty"));
    }
    if !request.scale().is_finite() || request.scale() <= 0.0 {
        return Err(HandlerError::invalid_request(format!(
            "Scale must be a positive number, got {}",
            request.scale()
        )));
    }

    // The existence check touches the disk, so it runs with the insertion.
    tokio::task::spawn_blocking(move || insert_existing(inserter.as_ref(), request))
        .await
        .map_err(|e| HandlerError::action_error(format!("Block inserter failed: {e}")))?
}

fn insert_existing(
    inserter: &dyn BlockInserter,
    mut request: InsertBlockRequest,
) -> Result<bool, HandlerError> {
    if !request.block_path.is_file() {
        return Err(HandlerError::block_not_found(request.block_path.display()));
    }

    if request.block_name.trim().is_empty() {
        request.block_name = request
            .block_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    debug!(
        "Inserting block {} from {}",
        request.block_name,
        request.block_path.display()
    );

    inserter.insert_block(&request)
}

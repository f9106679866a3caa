//! `GET_FILE_PREVIEW`: an image plus metadata for one library file.
//!
//! Image files preview themselves. Drawings (`.dwg`/`.dxf`) preview through a
//! companion `.png` with the same stem; a drawing without one still succeeds
//! with metadata only. Anything else is reported as unsupported, and so is an
//! image larger than the configured preview limit.
//!
//! Failures are reported inside the result (`IsSuccess = false`), never as an
//! error response.

use crate::handlers::tree::{
    DRAWING_EXTENSIONS, IMAGE_EXTENSIONS, companion_preview, format_modified, has_extension,
};

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// `Data` of a `GET_FILE_PREVIEW` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreviewRequest {
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreviewMetadata {
    pub file_name: String,
    pub extension: String,
    pub size: u64,
    pub modified: Option<String>,
    /// File the image was read from, when there is an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreviewResult {
    pub file_path: String,
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PreviewMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PreviewResult {
    pub fn failed(file_path: &Path, message: impl Into<String>) -> Self {
        Self {
            file_path: file_path.to_string_lossy().into_owned(),
            is_success: false,
            preview_image_base64: None,
            metadata: None,
            error_message: Some(message.into()),
        }
    }

    pub fn has_image(&self) -> bool {
        self.preview_image_base64
            .as_deref()
            .is_some_and(|image| !image.is_empty())
    }
}

/// Build the preview for `file_path`, refusing images over `max_image_bytes`.
pub fn build_preview(file_path: &Path, max_image_bytes: u64) -> PreviewResult {
    let metadata = match fs::metadata(file_path) {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return PreviewResult::failed(file_path, "Path is not a file"),
        Err(e) => {
            debug!("Preview requested for unreadable path {}: {e}", file_path.display());
            return PreviewResult::failed(
                file_path,
                format!("File not found: {}", file_path.display()),
            );
        }
    };

    let mut info = PreviewMetadata {
        file_name: file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        extension: file_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default(),
        size: metadata.len(),
        modified: metadata.modified().ok().map(format_modified),
        preview_source: None,
    };

    let source = if has_extension(file_path, &IMAGE_EXTENSIONS) {
        Some(file_path.to_path_buf())
    } else if has_extension(file_path, &DRAWING_EXTENSIONS) {
        companion_preview(file_path)
    } else {
        let mut result = PreviewResult::failed(
            file_path,
            format!("No preview available for '.{}' files", info.extension),
        );
        result.metadata = Some(info);
        return result;
    };

    let mut result = PreviewResult {
        file_path: file_path.to_string_lossy().into_owned(),
        is_success: true,
        preview_image_base64: None,
        metadata: None,
        error_message: None,
    };

    if let Some(source) = source {
        let image_len = fs::metadata(&source).map(|m| m.len()).unwrap_or(0);
        if image_len > max_image_bytes {
            warn!(
                "Preview image {} is {image_len} bytes, over the {max_image_bytes} byte limit",
                source.display()
            );
            result.is_success = false;
            result.error_message = Some(format!(
                "Preview image too large: {image_len} bytes (limit {max_image_bytes})"
            ));
            result.metadata = Some(info);
            return result;
        }

        match fs::read(&source) {
            Ok(bytes) => {
                result.preview_image_base64 = Some(BASE64.encode(bytes));
                info.preview_source = Some(source.to_string_lossy().into_owned());
            }
            Err(e) => {
                warn!("Failed to read preview image {}: {e}", source.display());
                result.is_success = false;
                result.error_message = Some(format!("Failed to read preview image: {e}"));
            }
        }
    }

    result.metadata = Some(info);
    result
}

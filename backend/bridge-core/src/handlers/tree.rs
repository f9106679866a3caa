//! `GET_BLOCK_LIBRARY_TREE`: directory tree of a block library.
//!
//! Folders come before files; each group is ordered by name, case-insensitively
//! with a case-sensitive tiebreak so the order is stable across platforms.
//! Hidden entries (leading `.`) and symlinks are skipped. A `.png` sitting next
//! to a drawing with the same stem is that drawing's preview: it is folded into
//! the drawing's `FileInfo.HasPreview` instead of being listed.

use crate::error::HandlerError;

use std::cmp::Ordering;
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use humantime::format_rfc3339_seconds;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub(crate) const DRAWING_EXTENSIONS: [&str; 2] = ["dwg", "dxf"];
pub(crate) const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];
pub(crate) const COMPANION_PREVIEW_EXTENSION: &str = "png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Folder,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    Folder,
    Dwg,
    Dxf,
    Image,
    File,
}

impl IconType {
    pub fn for_extension(extension: Option<&str>) -> Self {
        let Some(extension) = extension else {
            return IconType::File;
        };
        match extension.to_ascii_lowercase().as_str() {
            "dwg" => IconType::Dwg,
            "dxf" => IconType::Dxf,
            ext if IMAGE_EXTENSIONS.contains(&ext) => IconType::Image,
            _ => IconType::File,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileInfo {
    pub size: u64,
    /// RFC 3339, `None` when the platform does not report it.
    pub modified: Option<String>,
    pub has_preview: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "Type")]
    pub node_type: NodeType,
    pub icon_type: IconType,
    #[serde(default)]
    pub children: Vec<TreeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    /// Names of the direct children, in order.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }
}

/// `Data` of a `GET_BLOCK_LIBRARY_TREE` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TreeRequest {
    #[serde(default)]
    pub root_path: Option<PathBuf>,
}

/// Walk `root` into a [`TreeNode`].
///
/// # Errors
///
/// Returns `DIRECTORY_NOT_FOUND` if `root` is missing or not a directory.
/// Unreadable subdirectories are logged and listed without children.
pub fn build_tree(root: &Path) -> Result<TreeNode, HandlerError> {
    if !root.is_dir() {
        return Err(HandlerError::directory_not_found(root.display())
            .with_details(root.to_string_lossy().into_owned()));
    }

    debug!("Building block library tree for {}", root.display());
    Ok(folder_node(root))
}

fn folder_node(dir: &Path) -> TreeNode {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.to_string_lossy().into_owned());

    TreeNode {
        name,
        path: dir.to_string_lossy().into_owned(),
        node_type: NodeType::Folder,
        icon_type: IconType::Folder,
        children: read_children(dir),
        file_info: None,
    }
}

fn read_children(dir: &Path) -> Vec<TreeNode> {
    let entries: Vec<DirEntry> = match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(Result::ok).collect(),
        Err(e) => {
            warn!("Failed to read directory {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut folders = Vec::new();
    let mut files = Vec::new();

    for entry in &entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        let path = entry.path();
        if file_type.is_symlink() {
            debug!("Skipping symlink {}", path.display());
        } else if file_type.is_dir() {
            folders.push(folder_node(&path));
        } else if file_type.is_file() && !is_companion_preview(&path) {
            files.push(file_node(name, &path));
        }
    }

    folders.sort_by(|a, b| compare_names(&a.name, &b.name));
    files.sort_by(|a, b| compare_names(&a.name, &b.name));
    folders.extend(files);
    folders
}

fn file_node(name: String, path: &Path) -> TreeNode {
    let extension = path.extension().and_then(|e| e.to_str());
    let metadata = fs::metadata(path).ok();

    TreeNode {
        name,
        path: path.to_string_lossy().into_owned(),
        node_type: NodeType::File,
        icon_type: IconType::for_extension(extension),
        children: Vec::new(),
        file_info: Some(FileInfo {
            size: metadata.as_ref().map(|m| m.len()).unwrap_or_default(),
            modified: metadata
                .and_then(|m| m.modified().ok())
                .map(format_modified),
            has_preview: companion_preview(path).is_some(),
        }),
    }
}

pub(crate) fn format_modified(time: SystemTime) -> String {
    format_rfc3339_seconds(time).to_string()
}

pub(crate) fn has_extension(path: &Path, candidates: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| candidates.iter().any(|c| e.eq_ignore_ascii_case(c)))
        .unwrap_or(false)
}

/// The `.png` next to a drawing, if there is one.
pub(crate) fn companion_preview(path: &Path) -> Option<PathBuf> {
    if !has_extension(path, &DRAWING_EXTENSIONS) {
        return None;
    }
    [COMPANION_PREVIEW_EXTENSION, "PNG"]
        .iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

fn is_companion_preview(path: &Path) -> bool {
    if !has_extension(path, &[COMPANION_PREVIEW_EXTENSION]) {
        return false;
    }
    DRAWING_EXTENSIONS
        .iter()
        .flat_map(|ext| [ext.to_string(), ext.to_ascii_uppercase()])
        .any(|ext| path.with_extension(ext).is_file())
}

pub(crate) fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

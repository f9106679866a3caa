// Unit tests for the block library tree.

use crate::error::handler::codes;
use crate::handlers::tree::{IconType, NodeType, build_tree, compare_names};

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tempfile::TempDir;

fn touch(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, bytes).expect("write fixture");
}

/// **VALUE**: Verifies the canonical layout `root/{a.dwg, sub/b.dwg}` produces the
/// same tree on every call with folders listed before files.
///
/// **WHY THIS MATTERS**: The UI diffs successive trees to keep expansion state;
/// unstable ordering makes folders jump around on refresh.
#[test]
fn given_library_when_build_tree_twice_then_identical_and_folders_first() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path().join("root");
    touch(&root.join("a.dwg"), b"dwg");
    touch(&root.join("sub").join("b.dwg"), b"dwg-b");

    let first = build_tree(&root).expect("tree");
    let second = build_tree(&root).expect("tree");
    assert_eq!(first, second);

    assert_eq!(first.name, "root");
    assert_eq!(first.node_type, NodeType::Folder);
    assert_eq!(first.child_names(), vec!["sub", "a.dwg"]);

    let sub = &first.children[0];
    assert!(sub.is_folder());
    assert_eq!(sub.child_names(), vec!["b.dwg"]);

    let a = &first.children[1];
    assert_eq!(a.icon_type, IconType::Dwg);
    let info = a.file_info.as_ref().expect("file info");
    assert_eq!(info.size, 3);
    assert!(!info.has_preview);
    assert!(info.modified.is_some());
}

#[test]
fn given_mixed_case_names_when_build_tree_then_case_insensitive_order() {
    let dir = TempDir::new().expect("temp dir");
    for name in ["beta.dxf", "Gamma.png", "apple.DWG", "Alpha.dwg"] {
        touch(&dir.path().join(name), b"x");
    }

    let tree = build_tree(dir.path()).expect("tree");
    assert_eq!(
        tree.child_names(),
        vec!["Alpha.dwg", "apple.DWG", "beta.dxf", "Gamma.png"]
    );
    assert_eq!(tree.children[1].icon_type, IconType::Dwg);
    assert_eq!(tree.children[2].icon_type, IconType::Dxf);
    assert_eq!(tree.children[3].icon_type, IconType::Image);
}

/// **VALUE**: Verifies a drawing's companion `.png` is folded into the drawing.
///
/// **BUG THIS CATCHES**: Listing the companion as its own entry would show every
/// block twice in the palette.
#[test]
fn given_companion_png_when_build_tree_then_hidden_and_has_preview_set() {
    let dir = TempDir::new().expect("temp dir");
    touch(&dir.path().join("door.dwg"), b"dwg");
    touch(&dir.path().join("door.png"), b"png");
    touch(&dir.path().join("logo.png"), b"png");

    let tree = build_tree(dir.path()).expect("tree");
    assert_eq!(tree.child_names(), vec!["door.dwg", "logo.png"]);

    let door = tree.children[0].file_info.as_ref().expect("file info");
    assert!(door.has_preview);
}

#[test]
fn given_hidden_entries_when_build_tree_then_skipped() {
    let dir = TempDir::new().expect("temp dir");
    touch(&dir.path().join(".cache").join("x.dwg"), b"x");
    touch(&dir.path().join(".DS_Store"), b"x");
    touch(&dir.path().join("notes.txt"), b"x");

    let tree = build_tree(dir.path()).expect("tree");
    assert_eq!(tree.child_names(), vec!["notes.txt"]);
    assert_eq!(tree.children[0].icon_type, IconType::File);
}

#[test]
fn given_missing_root_when_build_tree_then_directory_not_found() {
    let dir = TempDir::new().expect("temp dir");

    let err = build_tree(&dir.path().join("missing")).expect_err("no such dir");
    assert_eq!(err.code, codes::DIRECTORY_NOT_FOUND);
    assert!(err.details.is_some());
}

#[test]
fn given_file_as_root_when_build_tree_then_directory_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let file = dir.path().join("a.dwg");
    touch(&file, b"x");

    let err = build_tree(&file).expect_err("not a dir");
    assert_eq!(err.code, codes::DIRECTORY_NOT_FOUND);
}

#[test]
fn given_tree_when_serialized_then_uses_wire_field_names() {
    let dir = TempDir::new().expect("temp dir");
    touch(&dir.path().join("a.dwg"), b"x");

    let value = serde_json::to_value(build_tree(dir.path()).expect("tree")).expect("json");
    assert_eq!(value["Type"], "folder");
    assert_eq!(value["IconType"], "folder");
    assert!(value.get("FileInfo").is_none());

    let child = &value["Children"][0];
    assert_eq!(child["Name"], "a.dwg");
    assert_eq!(child["Type"], "file");
    assert_eq!(child["IconType"], "dwg");
    assert_eq!(child["FileInfo"]["Size"], 1);
    assert_eq!(child["FileInfo"]["HasPreview"], false);
    assert_eq!(child["Children"], Value::Array(Vec::new()));
}

#[test]
fn given_names_differing_only_in_case_when_compared_then_uppercase_first() {
    assert_eq!(compare_names("Door", "door"), Ordering::Less);
    assert_eq!(compare_names("door", "Door"), Ordering::Greater);
    assert_eq!(compare_names("apple", "Banana"), Ordering::Less);
    assert_eq!(compare_names("same", "same"), Ordering::Equal);
}

mod through_dispatch {
    use super::touch;

    use crate::config::LibraryConfig;
    use crate::error::handler::codes;
    use crate::handlers::{BlockLibraryHandlers, TreeNode, actions};
    use crate::ipc::dispatch::DispatchTable;
    use crate::ipc::message::IpcRequest;

    use std::path::PathBuf;

    use serde_json::json;
    use tempfile::TempDir;

    fn table(root_path: Option<PathBuf>) -> DispatchTable {
        let library = LibraryConfig {
            root_path,
            ..LibraryConfig::default()
        };
        let mut table = DispatchTable::new();
        BlockLibraryHandlers::new(&library)
            .with_file_system()
            .register(&mut table);
        table
    }

    /// **VALUE**: Verifies the caller's `RootPath` wins over the configured root.
    ///
    /// **BUG THIS CATCHES**: A handler that always lists one fixed directory
    /// regardless of the request.
    #[tokio::test]
    async fn given_root_in_request_when_dispatch_then_request_root_listed() {
        let configured = TempDir::new().expect("temp dir");
        let requested = TempDir::new().expect("temp dir");
        touch(&requested.path().join("wanted.dwg"), b"x");
        touch(&configured.path().join("other.dwg"), b"x");

        let request = IpcRequest::new(
            actions::GET_BLOCK_LIBRARY_TREE,
            Some(json!({ "RootPath": requested.path() })),
        );
        let tree: TreeNode = table(Some(configured.path().to_path_buf()))
            .dispatch(&request)
            .await
            .data_as()
            .expect("tree");
        assert_eq!(tree.child_names(), vec!["wanted.dwg"]);
    }

    #[tokio::test]
    async fn given_no_data_when_dispatch_then_configured_root_listed() {
        let configured = TempDir::new().expect("temp dir");
        touch(&configured.path().join("other.dwg"), b"x");

        let request = IpcRequest::new(actions::GET_BLOCK_LIBRARY_TREE, None);
        let tree: TreeNode = table(Some(configured.path().to_path_buf()))
            .dispatch(&request)
            .await
            .data_as()
            .expect("tree");
        assert_eq!(tree.child_names(), vec!["other.dwg"]);
    }

    #[tokio::test]
    async fn given_no_root_anywhere_when_dispatch_then_invalid_request() {
        let request = IpcRequest::new(actions::GET_BLOCK_LIBRARY_TREE, Some(json!({})));

        let response = table(None).dispatch(&request).await;
        assert_eq!(response.error_code(), Some(codes::INVALID_REQUEST));
    }

    #[tokio::test]
    async fn given_missing_root_when_dispatch_then_directory_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let request = IpcRequest::new(
            actions::GET_BLOCK_LIBRARY_TREE,
            Some(json!({ "RootPath": dir.path().join("nope") })),
        );

        let response = table(None).dispatch(&request).await;
        assert_eq!(response.error_code(), Some(codes::DIRECTORY_NOT_FOUND));
    }

    #[tokio::test]
    async fn given_missing_file_when_preview_dispatched_then_success_response_with_failed_result() {
        let dir = TempDir::new().expect("temp dir");
        let request = IpcRequest::new(
            actions::GET_FILE_PREVIEW,
            Some(json!({ "FilePath": dir.path().join("ghost.dwg") })),
        );

        let response = table(None).dispatch(&request).await;
        assert!(response.is_success());
        let data = response.data.expect("data");
        assert_eq!(data["IsSuccess"], false);
    }
}

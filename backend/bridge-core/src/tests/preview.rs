// Unit tests for file previews.

use crate::handlers::preview::build_preview;

use std::fs;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tempfile::TempDir;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";
const LIMIT: u64 = 1024 * 1024;

#[test]
fn given_image_file_when_build_preview_then_image_is_the_file() {
    let dir = TempDir::new().expect("temp dir");
    let image = dir.path().join("logo.png");
    fs::write(&image, PNG_BYTES).expect("write");

    let result = build_preview(&image, LIMIT);
    assert!(result.is_success);
    assert!(result.has_image());
    assert_eq!(
        BASE64
            .decode(result.preview_image_base64.as_deref().unwrap_or_default())
            .expect("valid base64"),
        PNG_BYTES
    );

    let metadata = result.metadata.expect("metadata");
    assert_eq!(metadata.file_name, "logo.png");
    assert_eq!(metadata.extension, "png");
    assert_eq!(metadata.size, PNG_BYTES.len() as u64);
    let expected_source = image.to_string_lossy().into_owned();
    assert_eq!(
        metadata.preview_source.as_deref(),
        Some(expected_source.as_str())
    );
}

#[test]
fn given_drawing_with_companion_png_when_build_preview_then_companion_used() {
    let dir = TempDir::new().expect("temp dir");
    let drawing = dir.path().join("Door.DWG");
    fs::write(&drawing, b"AC1032").expect("write");
    fs::write(dir.path().join("Door.png"), PNG_BYTES).expect("write");

    let result = build_preview(&drawing, LIMIT);
    assert!(result.is_success);
    assert!(result.has_image());

    let metadata = result.metadata.expect("metadata");
    assert_eq!(metadata.extension, "dwg");
    assert!(
        metadata
            .preview_source
            .is_some_and(|source| source.ends_with("Door.png"))
    );
}

/// **VALUE**: Verifies a drawing without a companion image still succeeds.
///
/// **WHY THIS MATTERS**: Most libraries ship drawings without thumbnails; the
/// palette still shows their metadata.
#[test]
fn given_drawing_without_companion_when_build_preview_then_success_without_image() {
    let dir = TempDir::new().expect("temp dir");
    let drawing = dir.path().join("window.dxf");
    fs::write(&drawing, b"0\nSECTION").expect("write");

    let result = build_preview(&drawing, LIMIT);
    assert!(result.is_success);
    assert!(!result.has_image());
    assert!(result.error_message.is_none());
    assert!(result.metadata.is_some());
}

#[test]
fn given_missing_file_when_build_preview_then_failure_in_result() {
    let dir = TempDir::new().expect("temp dir");

    let result = build_preview(&dir.path().join("ghost.dwg"), LIMIT);
    assert!(!result.is_success);
    assert!(!result.has_image());
    assert!(
        result
            .error_message
            .is_some_and(|message| message.contains("not found"))
    );
}

#[test]
fn given_unsupported_type_when_build_preview_then_failure_with_metadata() {
    let dir = TempDir::new().expect("temp dir");
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, b"hello").expect("write");

    let result = build_preview(&notes, LIMIT);
    assert!(!result.is_success);
    assert!(!result.has_image());
    assert!(result.error_message.is_some());
    assert_eq!(result.metadata.expect("metadata").size, 5);
}

#[test]
fn given_failed_preview_when_serialized_then_optional_fields_omitted() {
    let dir = TempDir::new().expect("temp dir");

    let result = build_preview(&dir.path().join("ghost.png"), LIMIT);
    let value = serde_json::to_value(result).expect("json");
    assert_eq!(value["IsSuccess"], false);
    assert!(value.get("PreviewImageBase64").is_none());
    assert!(value["ErrorMessage"].is_string());
    assert!(value["FilePath"].is_string());
}

/// **VALUE**: An image bigger than the preview limit is refused inside the result.
///
/// **BUG THIS CATCHES**: Encoding a huge image would produce a response larger
/// than the frame limit, which the client treats as a broken connection.
#[test]
fn given_image_over_limit_when_build_preview_then_too_large_failure_with_metadata() {
    let dir = TempDir::new().expect("temp dir");
    let image = dir.path().join("poster.png");
    fs::write(&image, vec![0u8; 2048]).expect("write");

    let result = build_preview(&image, 1024);

    assert!(!result.is_success);
    assert!(!result.has_image());
    let message = result.error_message.expect("error message");
    assert!(message.contains("too large"), "unexpected message: {message}");
    assert_eq!(result.metadata.expect("metadata").size, 2048);
}

#[test]
fn given_companion_over_limit_when_build_preview_then_drawing_reported_too_large() {
    let dir = TempDir::new().expect("temp dir");
    let drawing = dir.path().join("sofa.dwg");
    fs::write(&drawing, b"dwg").expect("write");
    fs::write(dir.path().join("sofa.png"), vec![0u8; 2048]).expect("write");

    let result = build_preview(&drawing, 1024);

    assert!(!result.is_success);
    assert!(result.preview_image_base64.is_none());
    assert_eq!(result.metadata.expect("metadata").extension, "dwg");
}

#[test]
fn given_image_at_limit_when_build_preview_then_image_sent() {
    let dir = TempDir::new().expect("temp dir");
    let image = dir.path().join("exact.png");
    fs::write(&image, vec![7u8; 1024]).expect("write");

    let result = build_preview(&image, 1024);

    assert!(result.is_success);
    assert!(result.has_image());
}

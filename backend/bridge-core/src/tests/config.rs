// Unit tests for bridge.json loading, validation and saving.

use crate::DEFAULT_PIPE_NAME;
use crate::config::{BridgeConfig, CONFIG_FILE_NAME};
use crate::error::config::ConfigError;

use std::path::PathBuf;

use tempfile::TempDir;

#[test]
fn given_no_file_when_load_then_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let config = BridgeConfig::load(dir.path()).expect("defaults");
    assert_eq!(config, BridgeConfig::default());
    assert_eq!(config.pipe.name, DEFAULT_PIPE_NAME);
    assert_eq!(config.pipe.name, "BlockLibraryBridge_v1");
    assert_eq!(config.server.stop_timeout_ms, 2_000);
    assert_eq!(config.server.accept_retry_delay_ms, 1_000);
    assert_eq!(config.client.connect_timeout_ms, 10_000);
    assert_eq!(config.client.max_connect_attempts, 3);
    assert_eq!(config.client.initial_backoff_ms, 1_000);
    assert_eq!(config.library.command_timeout_ms, 30_000);
    assert!(config.library.root_path.is_none());
}

/// **VALUE**: Verifies a partial file only overrides the fields it names.
///
/// **BUG THIS CATCHES**: A missing `#[serde(default)]` on a section would make every
/// hand-written config fail to parse unless it lists every field.
#[test]
fn given_partial_file_when_load_then_missing_fields_defaulted() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{"pipe":{"name":"Custom"},"library":{"root_path":"/blocks"}}"#,
    )
    .expect("write config");

    let config = BridgeConfig::load(dir.path()).expect("load");
    assert_eq!(config.pipe.name, "Custom");
    assert_eq!(config.pipe.max_frame_bytes, 16 * 1024 * 1024);
    assert_eq!(config.library.root_path, Some(PathBuf::from("/blocks")));
    assert_eq!(config.client.max_connect_attempts, 3);
    assert_eq!(config.library.max_preview_bytes, 8 * 1024 * 1024);
}

#[test]
fn given_invalid_json_when_load_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ nope").expect("write config");

    let err = BridgeConfig::load(dir.path()).expect_err("bad json");
    assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
}

#[test]
fn given_zero_attempts_when_load_then_validation_error_names_field() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{"client":{"max_connect_attempts":0}}"#,
    )
    .expect("write config");

    let err = BridgeConfig::load(dir.path()).expect_err("invalid");
    match err {
        ConfigError::Validation { field, .. } => assert_eq!(field, "client.max_connect_attempts"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn given_invalid_values_when_validate_then_rejected() {
    let mut config = BridgeConfig::default();
    config.pipe.name = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = BridgeConfig::default();
    config.version = 99;
    assert!(config.validate().is_err());

    let mut config = BridgeConfig::default();
    config.server.stop_timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = BridgeConfig::default();
    config.pipe.max_frame_bytes = 0;
    assert!(config.validate().is_err());

    let mut config = BridgeConfig::default();
    config.library.command_timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = BridgeConfig::default();
    config.library.max_preview_bytes = 0;
    assert!(config.validate().is_err());
}

#[test]
fn given_config_when_save_then_load_returns_same_and_no_temp_left() {
    let dir = TempDir::new().expect("temp dir");
    let nested = dir.path().join("nested");

    let mut config = BridgeConfig::default();
    config.pipe.name = "SavedPipe".to_string();
    config.library.root_path = Some(PathBuf::from("/library"));
    config.save(&nested).expect("save");

    assert!(nested.join(CONFIG_FILE_NAME).is_file());
    assert!(!nested.join(format!("{CONFIG_FILE_NAME}.tmp")).exists());
    assert_eq!(BridgeConfig::load(&nested).expect("reload"), config);
}

#[test]
fn given_invalid_config_when_save_then_nothing_written() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.client.connect_timeout_ms = 0;

    assert!(config.save(dir.path()).is_err());
    assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
}

// Unit tests for logger module initialization logic
// Tests focus on repeat calls, error handling and the level override

use crate::logger::{LOG_FILE_NAME, LOG_LEVEL_ENV, configured_level, initialize, log_file_path};

use std::env;
use std::path::PathBuf;

use log::LevelFilter;
use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: The host binary and tests may both initialize logging.
/// If the second call panics, startup crashes.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed,
/// causing fern to panic when trying to set a global logger twice.
#[test]
#[serial]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = TempDir::new().expect("temp dir");

    // WHEN: Calling initialize twice
    let result1 = initialize(temp_dir.path());
    let result2 = initialize(temp_dir.path());

    // THEN: Both return Ok (the second one only warns)
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(
        result2.is_ok(),
        "Second initialization should succeed (idempotent)"
    );
}

#[test]
fn given_log_dir_when_log_file_path_then_host_log_inside_it() {
    let path = log_file_path(&PathBuf::from("logs"));
    assert_eq!(path, PathBuf::from("logs").join(LOG_FILE_NAME));
}

/// **VALUE**: Verifies the guard makes every later call a no-op, even with a bad path.
///
/// **BUG THIS CATCHES**: Would catch a second real initialization attempt, which
/// fern rejects once a global logger is set.
#[test]
#[serial]
fn given_logger_already_attempted_when_called_with_bad_dir_then_still_ok() {
    let temp_dir = TempDir::new().expect("temp dir");
    let _ = initialize(temp_dir.path());

    let result = initialize(&PathBuf::from("/dev/null/invalid-path"));
    assert!(result.is_ok(), "Later calls must not re-initialize");
}

#[test]
#[serial]
fn given_level_env_when_configured_level_then_env_wins() {
    unsafe { env::set_var(LOG_LEVEL_ENV, "trace") };
    assert_eq!(configured_level(), LevelFilter::Trace);

    unsafe { env::set_var(LOG_LEVEL_ENV, " WARN ") };
    assert_eq!(configured_level(), LevelFilter::Warn);

    unsafe { env::remove_var(LOG_LEVEL_ENV) };
}

#[test]
#[serial]
fn given_invalid_level_env_when_configured_level_then_build_default() {
    unsafe { env::set_var(LOG_LEVEL_ENV, "chatty") };
    let level = configured_level();
    unsafe { env::remove_var(LOG_LEVEL_ENV) };

    let expected = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    assert_eq!(level, expected);
}

use crate::DEFAULT_PIPE_NAME;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "bridge.json";
const CONFIG_VERSION: u32 = 1;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeConfig {
    #[serde(default = "default_pipe_name")]
    pub name: String,
    /// Largest frame either side accepts before dropping the connection.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            name: default_pipe_name(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_accept_retry_delay_ms")]
    pub accept_retry_delay_ms: u64,
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            accept_retry_delay_ms: default_accept_retry_delay_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl ServerSettings {
    pub fn accept_retry_delay(&self) -> Duration {
        Duration::from_millis(self.accept_retry_delay_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_max_connect_attempts")]
    pub max_connect_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            max_connect_attempts: default_max_connect_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

impl ClientSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Tree root used when a request does not name one.
    pub root_path: Option<PathBuf>,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Where the headless host records executed commands and insertions.
    pub journal_file: Option<PathBuf>,
    /// Largest preview image sent, before base64. Keep it well under
    /// `pipe.max_frame_bytes`; base64 grows the image by a third.
    #[serde(default = "default_max_preview_bytes")]
    pub max_preview_bytes: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            command_timeout_ms: default_command_timeout_ms(),
            journal_file: None,
            max_preview_bytes: default_max_preview_bytes(),
        }
    }
}

impl LibraryConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub pipe: PipeConfig,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub client: ClientSettings,

    #[serde(default)]
    pub library: LibraryConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            pipe: PipeConfig::default(),
            server: ServerSettings::default(),
            client: ClientSettings::default(),
            library: LibraryConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_pipe_name() -> String {
    DEFAULT_PIPE_NAME.to_string()
}
fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_accept_retry_delay_ms() -> u64 {
    1_000
}
fn default_stop_timeout_ms() -> u64 {
    2_000
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_max_connect_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    1_000
}
fn default_command_timeout_ms() -> u64 {
    30_000
}
fn default_max_preview_bytes() -> u64 {
    8 * 1024 * 1024
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Load config from {config_dir}/bridge.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, parsed or validated.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        let config: BridgeConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {e}");
            ConfigError::Parse {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/bridge.json through a temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, serialization or any write step fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| ConfigError::Validation {
            location: ErrorLocation::from(Location::caller()),
            field,
            reason,
        };

        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(invalid(
                "version",
                format!("{} (expected 1-{CONFIG_VERSION})", self.version),
            ));
        }

        if self.pipe.name.trim().is_empty() {
            return Err(invalid("pipe.name", "must not be empty".to_string()));
        }

        if self.pipe.max_frame_bytes == 0 || self.pipe.max_frame_bytes > i32::MAX as usize {
            return Err(invalid(
                "pipe.max_frame_bytes",
                format!("{} (must be 1-{})", self.pipe.max_frame_bytes, i32::MAX),
            ));
        }

        let positive = [
            ("server.stop_timeout_ms", self.server.stop_timeout_ms),
            ("client.connect_timeout_ms", self.client.connect_timeout_ms),
            ("library.command_timeout_ms", self.library.command_timeout_ms),
            ("library.max_preview_bytes", self.library.max_preview_bytes),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero".to_string()));
            }
        }

        if self.client.max_connect_attempts == 0 {
            return Err(invalid(
                "client.max_connect_attempts",
                "must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

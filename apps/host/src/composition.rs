//! Composition root: the one place that decides which collaborators serve
//! which actions.

use crate::cad::JournalCadHost;

use bridge_core::config::BridgeConfig;
use bridge_core::error::CoreError;
use bridge_core::handlers::BlockLibraryHandlers;
use bridge_core::ipc::{BridgeHost, DispatchTable};

use std::path::Path;
use std::sync::Arc;

use log::info;

/// Dispatch table with the filesystem library and `cad` for the CAD actions.
pub fn build_dispatch_table(config: &BridgeConfig, cad: Arc<JournalCadHost>) -> DispatchTable {
    let mut table = DispatchTable::new();
    BlockLibraryHandlers::new(&config.library)
        .with_file_system()
        .with_command_executor(cad.clone())
        .with_block_inserter(cad)
        .register(&mut table);
    table
}

/// Build a bridge for `config` without starting it.
pub fn build_bridge(config: &BridgeConfig) -> BridgeHost {
    let cad = Arc::new(JournalCadHost::new(config.library.journal_file.clone()));
    BridgeHost::from_config(config, build_dispatch_table(config, cad))
}

/// Load `bridge.json` from `config_dir` and start a bridge for it.
///
/// # Errors
///
/// Returns [`CoreError`] if the configuration is invalid or the server cannot
/// be started.
pub fn start_bridge(config_dir: &Path) -> Result<(BridgeHost, BridgeConfig), CoreError> {
    let config = BridgeConfig::load(config_dir)?;

    let bridge = build_bridge(&config);
    bridge.start()?;

    info!(
        "Bridge {} started (library root: {})",
        config.pipe.name,
        config
            .library
            .root_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<per request>".to_string())
    );
    Ok((bridge, config))
}

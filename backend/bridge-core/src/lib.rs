pub mod config;
pub mod error;
pub mod handlers;
pub mod ipc;

#[cfg(test)]
mod tests;

pub const BRIDGE_PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PIPE_NAME_PREFIX: &str = "BlockLibraryBridge";
pub const DEFAULT_PIPE_NAME: &str =
    const_format::concatcp!(DEFAULT_PIPE_NAME_PREFIX, "_v", BRIDGE_PROTOCOL_VERSION);

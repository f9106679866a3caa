//! IPC layer between the CAD host process and the UI process.
//!
//! This module implements a local named-channel transport (named pipe on
//! Windows, Unix domain socket elsewhere). It provides:
//!
//! - Length-prefixed framing ([`frame`])
//! - JSON request/response envelopes with correlation ids ([`message`])
//! - A single-client server loop that survives transport failures ([`server`])
//! - A client connector with bounded retries ([`client`])
//! - An action dispatch table for host-supplied handlers ([`dispatch`])
//! - A lifecycle controller owning the server ([`lifecycle`])
//!
//! # Protocol
//!
//! `[4-byte little-endian length][UTF-8 JSON envelope]`, strictly alternating
//! request and response on one connection.

pub mod client;
mod connection_state;
pub mod dispatch;
pub mod endpoint;
pub mod frame;
pub mod lifecycle;
pub mod message;
pub mod server;
pub mod state;

pub use client::IpcClient;
pub use dispatch::{DispatchTable, HandlerFn, HandlerResult};
pub use lifecycle::BridgeHost;
pub use message::{IpcRequest, IpcResponse, MessageError, MessageType};
pub use server::IpcServer;
pub use state::ServerState;

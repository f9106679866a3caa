//! Observable server state.
//!
//! The accept loop is the only writer. Everyone else reads through a
//! `tokio::sync::watch` receiver, so a caller can await a transition
//! (for instance "back to listening after a client dropped") instead of polling.

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

/// `Idle → Listening → Connected → Listening → … → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed, never started.
    Idle,

    /// Endpoint bound, waiting for a client.
    Listening,

    /// Serving one client.
    Connected,

    /// Stopped after running; may be started again.
    Stopped,
}

impl Display for ServerState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ServerState::Idle => "idle",
            ServerState::Listening => "listening",
            ServerState::Connected => "connected",
            ServerState::Stopped => "stopped",
        };
        formatter.write_str(name)
    }
}

/// Wait until `receiver` reports `wanted`, giving up after `limit`.
///
/// Returns `true` if the state was reached in time.
pub async fn wait_for_state(
    receiver: &mut watch::Receiver<ServerState>,
    wanted: ServerState,
    limit: Duration,
) -> bool {
    matches!(
        timeout(limit, receiver.wait_for(|state| *state == wanted)).await,
        Ok(Ok(_))
    )
}

//! Listener state machine.

use std::fmt;

/// Lifecycle state of an [`HttpServer`](crate::http::HttpServer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Constructed, never started.
    #[default]
    Uninitialized,
    /// Accepting connections.
    Listening,
    /// Listener released; may be started again.
    Stopped,
    /// Torn down. Terminal.
    Closed,
}

impl ServerState {
    /// State after a start request, or `None` when starting is not allowed.
    pub fn on_start(self) -> Option<Self> {
        match self {
            ServerState::Closed => None,
            _ => Some(ServerState::Listening),
        }
    }

    /// State after a stop request. Only a listening server changes.
    pub fn on_stop(self) -> Self {
        match self {
            ServerState::Listening => ServerState::Stopped,
            other => other,
        }
    }

    /// State after a close request.
    pub fn on_close(self) -> Self {
        ServerState::Closed
    }

    /// Whether the accept loop should be running.
    pub fn is_listening(self) -> bool {
        self == ServerState::Listening
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Uninitialized => "uninitialized",
            ServerState::Listening => "listening",
            ServerState::Stopped => "stopped",
            ServerState::Closed => "closed",
        };
        f.write_str(name)
    }
}

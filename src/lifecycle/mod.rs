//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! State machine (state.rs):
//!     Uninitialized ─start→ Listening ─stop→ Stopped ─start→ Listening
//!     any ─close→ Closed (terminal)
//!
//! Shutdown (shutdown.rs):
//!     stop/close → trigger → accept loop leaves its select → listener released
//!
//! Signals (signals.rs):
//!     SIGINT → host closes the server
//! ```
//!
//! # Design Decisions
//! - Stopped ↔ Listening is the only cycle; Closed is terminal
//! - Each listening period owns its own shutdown channel, so a stale
//!   trigger can never reach a later accept loop

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::Shutdown;
pub use state::ServerState;

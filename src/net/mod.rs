//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! BindTarget (validated address/port/suffix)
//!     → listener.rs (bind, accept, connection limits)
//!     → connection.rs (identity, active count)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - A permit is taken before accepting, never after

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionSet, ConnectionTracker};
pub use listener::{BindTarget, ConnectionPermit, Listener, ListenerError};

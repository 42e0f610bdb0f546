//! The xAPI resources served by the LRS.
//!
//! # Data Flow
//! ```text
//! IncomingRequest
//!     → router.rs (CORS, preflight, resource match)
//!     → statements.rs | agent_profile.rs | activity_state.rs
//!     → events.rs (observers) and delegate.rs (host hooks)
//!     → Reply or LrsError → ResponseWriter
//! ```

pub mod activity_state;
pub(crate) mod agent_profile;
pub mod delegate;
pub mod error;
pub mod events;
pub mod router;
pub mod server;
pub(crate) mod statements;

use bytes::Bytes;
use hyper::StatusCode;

pub use activity_state::{StateHandler, StateHandlers, StateMethod};
pub use delegate::{LrsDelegate, ProfileAlteration};
pub use error::LrsError;
pub use events::{AgentProfileReceived, BoxError, Observers, StatementReceived};
pub use router::{LrsRouter, Resource, ALLOWED_HEADERS, ALLOWED_METHODS};
pub use server::LrsServer;

/// A successful resource outcome, before CORS headers are applied.
#[derive(Debug)]
pub(crate) enum Reply {
    Status(StatusCode),
    Json(StatusCode, Bytes),
    /// Handled, but nothing is written; the connection closes.
    Unanswered,
}

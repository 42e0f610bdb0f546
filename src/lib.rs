//! Local xAPI Learning Record Store.
//!
//! An embeddable HTTP server that accepts xAPI statements and agent profile
//! documents from locally launched content and hands them to the host
//! through observers, callbacks and an optional [`LrsDelegate`].

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod lrs;
pub mod net;
pub mod observability;
pub mod xapi;

pub use config::schema::LrsConfig;
pub use http::{IncomingRequest, OutgoingResponse, ResponseWriter, ServerError};
pub use lifecycle::ServerState;
pub use lrs::{
    AgentProfileReceived, LrsDelegate, LrsServer, ProfileAlteration, StateMethod,
    StatementReceived,
};
pub use xapi::{Agent, AgentProfileDocument, Statement};

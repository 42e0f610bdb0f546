//! Minimal xAPI data shapes the router needs.
//!
//! The full xAPI model lives with the host; statements stay opaque JSON
//! objects here and only the fields the server touches are typed.

pub mod agent;
pub mod document;
pub mod statement;

use thiserror::Error;

pub use agent::{Agent, AgentAccount};
pub use document::AgentProfileDocument;
pub use statement::Statement;

/// Failure turning request data into xAPI values.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object or an array of objects")]
    UnexpectedPayload,

    #[error("statement id `{0}` is not a UUID")]
    InvalidId(String),

    #[error("invalid agent: {0}")]
    InvalidAgent(#[source] serde_json::Error),
}

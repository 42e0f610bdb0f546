use chrono::{DateTime, Utc};

use super::Agent;

/// A free-form document stored under an (agent, profile id) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentProfileDocument {
    /// The profile id.
    pub id: Option<String>,
    pub agent: Option<Agent>,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl AgentProfileDocument {
    /// A document holding `content` under `id`.
    pub fn new(id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Some(id.into()),
            content: content.into(),
            ..Self::default()
        }
    }

    /// The content as UTF-8 text, if it is.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

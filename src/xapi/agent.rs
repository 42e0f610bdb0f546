use serde::{Deserialize, Serialize};

use super::ParseError;

/// An xAPI agent. Any one of the inverse functional identifiers may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "objectType", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox_sha1sum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AgentAccount>,
}

/// An account on some system, identifying an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAccount {
    #[serde(rename = "homePage", default, skip_serializing_if = "Option::is_none")]
    pub home_page: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Agent {
    /// Deserialize the JSON carried in an `agent` query parameter.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        serde_json::from_str(json).map_err(ParseError::InvalidAgent)
    }
}

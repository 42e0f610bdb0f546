//! Host-supplied capabilities consulted by the router.

use crate::http::{IncomingRequest, OutgoingResponse};
use crate::xapi::AgentProfileDocument;

/// The pending response and document handed through the alteration hook.
#[derive(Debug, Clone, Default)]
pub struct ProfileAlteration {
    /// Response written once the hook returns; its status is set to 204.
    pub response: OutgoingResponse,
    /// The received document, or `None` for deletes.
    pub document: Option<AgentProfileDocument>,
}

/// Customizes how the server answers agent-profile requests and CORS.
///
/// Called from request workers concurrently; implementations synchronize
/// their own state.
pub trait LrsDelegate: Send + Sync {
    /// The stored document for `profile_id`, if any.
    fn agent_profile_document(&self, profile_id: &str) -> Option<AgentProfileDocument>;

    /// Origin to allow; `None` or empty falls back to the server default.
    fn access_control_allow_origin(&self) -> Option<String>;

    /// Inspect a profile write or delete and return the response and document
    /// to use, replacing either as needed.
    fn alter_agent_profile_response(
        &self,
        request: &IncomingRequest,
        alteration: ProfileAlteration,
    ) -> ProfileAlteration;
}

//! The `/agents/profile` resource.

use bytes::Bytes;
use hyper::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use hyper::{Method, StatusCode};

use crate::http::{IncomingRequest, OutgoingResponse, ResponseWriter};
use crate::lrs::delegate::{LrsDelegate, ProfileAlteration};
use crate::lrs::events::{AgentProfileReceived, Observers};
use crate::lrs::{LrsError, Reply};
use crate::observability::metrics;
use crate::xapi::{Agent, AgentProfileDocument};

const PROFILE_ID: &str = "profileId";
const AGENT: &str = "agent";

pub(crate) fn handle(
    request: &IncomingRequest,
    writer: &mut ResponseWriter,
    delegate: Option<&dyn LrsDelegate>,
    observers: &Observers<AgentProfileReceived>,
) -> Result<Reply, LrsError> {
    match request.method() {
        &Method::GET => fetch(request, delegate),
        &Method::POST | &Method::PUT => {
            let document = received_document(request)?;
            observers
                .notify(&AgentProfileReceived {
                    document: document.clone(),
                })
                .map_err(LrsError::Observer)?;
            metrics::record_agent_profile();

            if let Some(delegate) = delegate {
                alter(delegate, request, writer, Some(document));
            }
            Ok(Reply::Status(StatusCode::NO_CONTENT))
        }
        &Method::DELETE => {
            let delegate =
                delegate.ok_or(LrsError::NotImplemented("agent profile deletion"))?;
            alter(delegate, request, writer, None);
            Ok(Reply::Status(StatusCode::NO_CONTENT))
        }
        other => Err(LrsError::UnsupportedMethod {
            method: other.clone(),
            resource: "agent profiles",
        }),
    }
}

fn fetch(request: &IncomingRequest, delegate: Option<&dyn LrsDelegate>) -> Result<Reply, LrsError> {
    let profile_id = request
        .query_param(PROFILE_ID)
        .filter(|id| !id.trim().is_empty())
        .ok_or(LrsError::NotImplemented("agent profile listing"))?;

    let document = delegate
        .and_then(|delegate| delegate.agent_profile_document(profile_id))
        .ok_or_else(|| LrsError::DocumentNotFound(profile_id.to_string()))?;

    Ok(Reply::Json(StatusCode::OK, Bytes::from(document.content)))
}

/// The document a POST or PUT carries.
fn received_document(request: &IncomingRequest) -> Result<AgentProfileDocument, LrsError> {
    let agent = request.query_param(AGENT).map(Agent::from_json).transpose()?;
    Ok(AgentProfileDocument {
        id: request.query_param(PROFILE_ID).map(str::to_string),
        agent,
        content: request.body().to_vec(),
        content_type: request.content_type().map(str::to_string),
        ..AgentProfileDocument::default()
    })
}

/// Let the delegate replace the pending response; the status stays 204.
///
/// The pending origin header survives unless the delegate sets its own.
fn alter(
    delegate: &dyn LrsDelegate,
    request: &IncomingRequest,
    writer: &mut ResponseWriter,
    document: Option<AgentProfileDocument>,
) {
    let response = writer.replace_response(OutgoingResponse::default());
    let origin = response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).cloned();
    let mut altered =
        delegate.alter_agent_profile_response(request, ProfileAlteration { response, document });
    if let Some(document) = &altered.document {
        tracing::debug!(profile_id = ?document.id, "Delegate returned a profile document");
    }
    if let Some(origin) = origin {
        altered
            .response
            .headers_mut()
            .entry(ACCESS_CONTROL_ALLOW_ORIGIN)
            .or_insert(origin);
    }
    writer.replace_response(altered.response);
}

//! Request routing for the LRS resources.
//!
//! # Responsibilities
//! - Stamp every response with `Access-Control-Allow-Origin`, including the
//!   ones the HTTP layer answers itself
//! - Answer CORS preflight (OPTIONS) on any path
//! - Route by path to statements, activity state and agent profile handlers
//! - Map handler failures to status codes
//!
//! # Design Decisions
//! - Unknown paths get 204 rather than 404
//! - Activity-state requests bypass error mapping: the host callback owns the write

use std::sync::Arc;

use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::{Method, StatusCode};

use crate::http::{ContentType, IncomingRequest, OutgoingResponse, RequestHandler, ResponseWriter};
use crate::lrs::activity_state::StateHandlers;
use crate::lrs::delegate::LrsDelegate;
use crate::lrs::events::{AgentProfileReceived, Observers, StatementReceived};
use crate::lrs::{agent_profile, statements, LrsError, Reply};

/// Methods advertised in preflight responses.
pub const ALLOWED_METHODS: &str = "GET, POST, DELETE, PUT";

/// Request headers advertised in preflight responses.
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization, Origin, Accept, User-Agent, \
X-Experience-API-Version, If-Match, If-None-Match";

/// The resources the router serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Statements,
    ActivityState,
    AgentProfile,
}

impl Resource {
    /// Match a route path exactly. Query strings are not part of the path.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/statements" => Some(Resource::Statements),
            "/activities/state" => Some(Resource::ActivityState),
            "/agents/profile" => Some(Resource::AgentProfile),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Statements => "statements",
            Resource::ActivityState => "activity_state",
            Resource::AgentProfile => "agent_profile",
        }
    }
}

/// Routes requests to the LRS resource handlers.
pub struct LrsRouter {
    delegate: Option<Arc<dyn LrsDelegate>>,
    default_origin: HeaderValue,
    statement_observers: Observers<StatementReceived>,
    profile_observers: Observers<AgentProfileReceived>,
    state_handlers: StateHandlers,
}

impl LrsRouter {
    pub fn new(delegate: Option<Arc<dyn LrsDelegate>>, default_origin: HeaderValue) -> Self {
        Self {
            delegate,
            default_origin,
            statement_observers: Observers::new(),
            profile_observers: Observers::new(),
            state_handlers: StateHandlers::default(),
        }
    }

    pub fn delegate(&self) -> Option<&Arc<dyn LrsDelegate>> {
        self.delegate.as_ref()
    }

    pub fn statement_observers(&self) -> &Observers<StatementReceived> {
        &self.statement_observers
    }

    pub fn profile_observers(&self) -> &Observers<AgentProfileReceived> {
        &self.profile_observers
    }

    pub fn state_handlers(&self) -> &StateHandlers {
        &self.state_handlers
    }

    /// The delegate's origin when it supplies a usable one, else the default.
    fn allowed_origin(&self) -> HeaderValue {
        self.delegate
            .as_ref()
            .and_then(|delegate| delegate.access_control_allow_origin())
            .filter(|origin| !origin.trim().is_empty())
            .and_then(|origin| match HeaderValue::from_str(&origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Delegate origin is not a valid header value");
                    None
                }
            })
            .unwrap_or_else(|| self.default_origin.clone())
    }
}

impl RequestHandler for LrsRouter {
    fn handle_request(&self, request: IncomingRequest, mut writer: ResponseWriter) {
        writer.insert_header(ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin());

        if *request.method() == Method::OPTIONS {
            writer.insert_header(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            writer.insert_header(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            );
            writer.send(StatusCode::OK);
            return;
        }

        let Some(resource) = Resource::from_path(request.route_path()) else {
            tracing::debug!(path = %request.route_path(), "No resource at path");
            writer.send(StatusCode::NO_CONTENT);
            return;
        };

        tracing::debug!(
            resource = resource.name(),
            method = %request.method(),
            "Routing request"
        );

        let outcome = match resource {
            Resource::ActivityState => {
                self.state_handlers.dispatch(request, writer);
                return;
            }
            Resource::Statements => statements::handle(&request, &self.statement_observers),
            Resource::AgentProfile => agent_profile::handle(
                &request,
                &mut writer,
                self.delegate.as_deref(),
                &self.profile_observers,
            ),
        };
        reply(resource, &request, writer, outcome);
    }

    fn decorate(&self, response: &mut OutgoingResponse) {
        if !response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
            response
                .headers_mut()
                .insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin());
        }
    }
}

fn reply(
    resource: Resource,
    request: &IncomingRequest,
    writer: ResponseWriter,
    outcome: Result<Reply, LrsError>,
) {
    match outcome {
        Ok(Reply::Status(status)) => writer.send(status),
        Ok(Reply::Json(status, body)) => writer.write(body, Some(ContentType::Json), status),
        Ok(Reply::Unanswered) => {
            tracing::debug!(
                resource = resource.name(),
                method = %request.method(),
                "Request handled without a response"
            );
            drop(writer);
        }
        Err(e) => {
            let status = e.status();
            tracing::warn!(
                resource = resource.name(),
                method = %request.method(),
                status = status.as_u16(),
                error = %e,
                "Request failed"
            );
            writer.send(status);
        }
    }
}

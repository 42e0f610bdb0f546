//! In-memory host for the bundled binary.

use bytes::Bytes;
use dashmap::DashMap;
use hyper::header::{HeaderValue, CONTENT_TYPE, ETAG};
use hyper::StatusCode;

use local_lrs::{
    AgentProfileDocument, IncomingRequest, LrsDelegate, ProfileAlteration, ResponseWriter,
    StateMethod,
};

/// Key identifying one activity state document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StateKey {
    activity_id: String,
    agent: String,
    state_id: String,
    registration: Option<String>,
}

impl StateKey {
    fn from_request(request: &IncomingRequest) -> Option<Self> {
        Some(Self {
            activity_id: request.query_param("activityId")?.to_string(),
            agent: request.query_param("agent")?.to_string(),
            state_id: request.query_param("stateId")?.to_string(),
            registration: request.query_param("registration").map(str::to_string),
        })
    }
}

struct StoredState {
    content: Bytes,
    content_type: Option<HeaderValue>,
}

/// Profiles and activity state held for the life of the process.
#[derive(Default)]
pub struct MemoryHost {
    profiles: DashMap<String, AgentProfileDocument>,
    states: DashMap<StateKey, StoredState>,
}

impl MemoryHost {
    pub fn store_profile(&self, mut document: AgentProfileDocument) {
        let Some(id) = document.id.clone() else {
            tracing::warn!("Agent profile without profileId ignored");
            return;
        };
        document.timestamp = Some(chrono::Utc::now());
        document.etag = Some(format!("\"{}\"", uuid::Uuid::new_v4().simple()));
        tracing::info!(profile_id = %id, bytes = document.content.len(), "Agent profile stored");
        self.profiles.insert(id, document);
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn handle_state(&self, method: StateMethod, request: IncomingRequest, writer: ResponseWriter) {
        let Some(key) = StateKey::from_request(&request) else {
            writer.send(StatusCode::BAD_REQUEST);
            return;
        };

        match method {
            StateMethod::Get => match self.states.get(&key) {
                Some(state) => {
                    let mut writer = writer;
                    if let Some(content_type) = &state.content_type {
                        writer.insert_header(CONTENT_TYPE, content_type.clone());
                    }
                    writer.write(state.content.clone(), None, StatusCode::OK);
                }
                None => writer.send(StatusCode::NOT_FOUND),
            },
            StateMethod::Post | StateMethod::Put => {
                let state = StoredState {
                    content: request.body().clone(),
                    content_type: request.headers().get(CONTENT_TYPE).cloned(),
                };
                self.states.insert(key, state);
                writer.send(StatusCode::NO_CONTENT);
            }
            StateMethod::Delete => {
                self.states.remove(&key);
                writer.send(StatusCode::NO_CONTENT);
            }
        }
    }
}

impl LrsDelegate for MemoryHost {
    fn agent_profile_document(&self, profile_id: &str) -> Option<AgentProfileDocument> {
        self.profiles.get(profile_id).map(|entry| entry.value().clone())
    }

    fn access_control_allow_origin(&self) -> Option<String> {
        None
    }

    fn alter_agent_profile_response(
        &self,
        request: &IncomingRequest,
        mut alteration: ProfileAlteration,
    ) -> ProfileAlteration {
        let Some(profile_id) = request.query_param("profileId") else {
            return alteration;
        };

        if alteration.document.is_none() {
            if self.profiles.remove(profile_id).is_some() {
                tracing::info!(profile_id = %profile_id, "Agent profile deleted");
            }
            return alteration;
        }

        let etag = self
            .profiles
            .get(profile_id)
            .and_then(|entry| entry.etag.clone())
            .and_then(|etag| HeaderValue::from_str(&etag).ok());
        if let Some(etag) = etag {
            alteration.response.headers_mut().insert(ETAG, etag);
        }
        alteration
    }
}

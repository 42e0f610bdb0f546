//! The `/activities/state` resource, answered entirely by host callbacks.
//!
//! Each method has one optional callback. The callback receives the request
//! and owns the single write; with no callback registered nothing is written
//! and the connection is closed.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use hyper::Method;

use crate::http::{IncomingRequest, ResponseWriter};

/// Methods a state callback can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl StateMethod {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(StateMethod::Get),
            Method::POST => Some(StateMethod::Post),
            Method::PUT => Some(StateMethod::Put),
            Method::DELETE => Some(StateMethod::Delete),
            _ => None,
        }
    }
}

/// A registered state callback.
pub struct StateHandler {
    callback: Box<dyn Fn(IncomingRequest, ResponseWriter) + Send + Sync>,
}

impl StateHandler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(IncomingRequest, ResponseWriter) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    fn call(&self, request: IncomingRequest, writer: ResponseWriter) {
        (self.callback)(request, writer)
    }
}

/// One replaceable callback slot per method.
#[derive(Default)]
pub struct StateHandlers {
    get: ArcSwapOption<StateHandler>,
    post: ArcSwapOption<StateHandler>,
    put: ArcSwapOption<StateHandler>,
    delete: ArcSwapOption<StateHandler>,
}

impl StateHandlers {
    /// Register `callback` for `method`, replacing any previous one.
    pub fn set<F>(&self, method: StateMethod, callback: F)
    where
        F: Fn(IncomingRequest, ResponseWriter) + Send + Sync + 'static,
    {
        self.slot(method)
            .store(Some(Arc::new(StateHandler::new(callback))));
    }

    pub fn clear(&self, method: StateMethod) {
        self.slot(method).store(None);
    }

    pub fn is_registered(&self, method: StateMethod) -> bool {
        self.slot(method).load().is_some()
    }

    pub(crate) fn dispatch(&self, request: IncomingRequest, writer: ResponseWriter) {
        let Some(method) = StateMethod::from_method(request.method()) else {
            tracing::debug!(method = %request.method(), "Unsupported state method; nothing written");
            return;
        };
        match self.slot(method).load_full() {
            Some(handler) => handler.call(request, writer),
            None => {
                tracing::debug!(method = %request.method(), "No state callback registered; nothing written");
                drop(writer);
            }
        }
    }

    fn slot(&self, method: StateMethod) -> &ArcSwapOption<StateHandler> {
        match method {
            StateMethod::Get => &self.get,
            StateMethod::Post => &self.post,
            StateMethod::Put => &self.put,
            StateMethod::Delete => &self.delete,
        }
    }
}

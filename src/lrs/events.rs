//! Notifications raised while handling requests.
//!
//! Observers run synchronously on the request's worker, in registration
//! order. The first observer to fail stops the rest and fails the request.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::xapi::{AgentProfileDocument, Statement};

/// Error an observer may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A registered callback.
pub type Observer<E> = Arc<dyn Fn(&E) -> Result<(), BoxError> + Send + Sync>;

/// A statement was received and stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementReceived {
    pub statement: Statement,
}

/// An agent profile document was received.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfileReceived {
    pub document: AgentProfileDocument,
}

/// Ordered observer list; registration never blocks delivery.
pub struct Observers<E> {
    observers: ArcSwap<Vec<Observer<E>>>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            observers: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&E) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let observer: Observer<E> = Arc::new(observer);
        self.observers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&observer));
            next
        });
    }

    /// Deliver `event` to every observer, stopping at the first failure.
    pub fn notify(&self, event: &E) -> Result<(), BoxError> {
        let observers = self.observers.load();
        for observer in observers.iter() {
            observer(event)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.observers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

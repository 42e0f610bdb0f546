//! Connection identity and lifetime tracking.
//!
//! # Responsibilities
//! - Give each accepted connection an id for tracing
//! - Own the connection tasks of one listening period
//! - Count connections currently being served, across periods
//!
//! # Design Decisions
//! - Dropping a `ConnectionSet` aborts every task it still holds, so tearing
//!   down the accept loop tears down its connections with it
//! - The count is decremented by a guard inside the task, which also runs
//!   when the task is aborted

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts connections that are still being served.
///
/// Shared by every listening period of a server, so the count survives
/// stop/start cycles while old connections drain.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&self, id: ConnectionId) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %id, "Connection opened");
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Held by a connection task for its whole life.
#[derive(Debug)]
struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// The connection tasks spawned during one listening period.
#[derive(Debug)]
pub struct ConnectionSet {
    tracker: ConnectionTracker,
    tasks: JoinSet<()>,
}

impl ConnectionSet {
    pub fn new(tracker: ConnectionTracker) -> Self {
        Self {
            tracker,
            tasks: JoinSet::new(),
        }
    }

    /// Spawn the task serving one connection.
    pub fn spawn<F, Fut>(&mut self, serve: F) -> ConnectionId
    where
        F: FnOnce(ConnectionId) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = ConnectionId::new();
        let guard = self.tracker.track(id);
        let connection = serve(id);
        self.tasks.spawn(async move {
            let _guard = guard;
            connection.await;
        });
        id
    }

    /// Wait for one connection to finish. `None` when the set is empty.
    pub async fn reap(&mut self) -> Option<()> {
        let finished = self.tasks.join_next().await?;
        if let Err(e) = finished {
            if e.is_panic() {
                tracing::error!(error = %e, "Connection task panicked");
            }
        }
        Some(())
    }

    /// Wait until every connection has finished.
    pub async fn drain(&mut self) {
        while self.reap().await.is_some() {}
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

//! HTTP server lifecycle and accept loop.
//!
//! # Responsibilities
//! - Own the bind target and the start/stop/close state machine
//! - Keep exactly one accept outstanding while listening
//! - Serve each connection on its own task (HTTP/1.1 and HTTP/2)
//! - Wire up middleware (request ID, tracing)
//! - Run the request handler on a blocking worker and deliver its one response
//!
//! # Design Decisions
//! - The accept loop spawns the connection task and immediately accepts again,
//!   so the next accept is armed before the current handler runs
//! - An accept that completes after teardown is dropped, never an error
//! - Connections belong to the accept loop of their listening period: `stop`
//!   drains them gracefully, `close` aborts them
//! - Once a period is torn down no request on its connections reaches the handler
//! - Handler panics become 400 when nothing was written yet

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::{ConfigError, ListenerConfig};
use crate::http::request::IncomingRequest;
use crate::http::response::{OutgoingResponse, ResponseWriter};
use crate::lifecycle::{ServerState, Shutdown};
use crate::net::{
    BindTarget, ConnectionId, ConnectionPermit, ConnectionSet, ConnectionTracker, Listener,
    ListenerError,
};
use crate::observability::metrics;

/// Error type for server construction and lifecycle operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid address, port or suffix.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `start` was called after `close`.
    #[error("server has been closed")]
    Closed,

    /// The OS listener could not be created.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Answers requests accepted by an [`HttpServer`].
///
/// Called on a blocking worker; the handler may take as long as it needs and
/// must write through `writer` at most once. Dropping the writer unwritten
/// closes the connection without a response.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle_request(&self, request: IncomingRequest, writer: ResponseWriter);

    /// Adjust every response before it is sent, including the ones the
    /// server answers itself (413, read failures, panics, foreign paths).
    fn decorate(&self, _response: &mut OutgoingResponse) {}
}

/// Tunables for a server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        let listener = ListenerConfig::default();
        Self::from(&listener)
    }
}

impl From<&ListenerConfig> for ServerOptions {
    fn from(config: &ListenerConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            max_body_size: config.max_body_size,
        }
    }
}

/// Returned to hyper to close the connection without a response.
#[derive(Debug, Error)]
enum DispatchError {
    #[error("request handler completed without writing a response")]
    Unanswered,

    #[error("server torn down; request refused")]
    Disposed,
}

/// One listening period: the running accept loop and how to stop it.
struct AcceptLoop {
    shutdown: Shutdown,
    disposed: Arc<AtomicBool>,
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl AcceptLoop {
    fn retire(self) -> JoinHandle<()> {
        self.disposed.store(true, Ordering::SeqCst);
        self.shutdown.trigger();
        self.task
    }
}

#[derive(Default)]
struct Lifecycle {
    state: ServerState,
    active: Option<AcceptLoop>,
    /// Loop from the last stop; awaited before rebinding the port.
    retired: Option<JoinHandle<()>>,
}

/// Everything a connection task needs, shared across listening periods.
struct ConnectionScope<H> {
    handler: Arc<H>,
    path_prefix: String,
    max_body_size: usize,
    tracker: ConnectionTracker,
}

impl<H: RequestHandler> ConnectionScope<H> {
    /// Path relative to the bind suffix, or `None` when outside it.
    fn route_path(&self, path: &str) -> Option<String> {
        path.strip_prefix(self.path_prefix.as_str())
            .map(|rest| format!("/{rest}"))
    }

    /// Let the handler decorate the response, record it, and convert it.
    fn finish(
        &self,
        method: &Method,
        mut response: OutgoingResponse,
        start_time: Instant,
    ) -> Response<Full<Bytes>> {
        self.handler.decorate(&mut response);
        metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
        response.into_http()
    }
}

/// A local HTTP server with an explicit lifecycle.
pub struct HttpServer<H: RequestHandler> {
    target: BindTarget,
    scope: Arc<ConnectionScope<H>>,
    max_connections: usize,
    lifecycle: Mutex<Lifecycle>,
    /// Held across a whole `start`, so concurrent starts bind once.
    start_gate: tokio::sync::Mutex<()>,
}

impl<H: RequestHandler> HttpServer<H> {
    /// Create a server; nothing is bound until [`start`](Self::start).
    pub fn new(target: BindTarget, handler: H, options: ServerOptions) -> Self {
        let scope = Arc::new(ConnectionScope {
            handler: Arc::new(handler),
            path_prefix: target.path_prefix(),
            max_body_size: options.max_body_size,
            tracker: ConnectionTracker::new(),
        });
        Self {
            target,
            scope,
            max_connections: options.max_connections,
            lifecycle: Mutex::new(Lifecycle::default()),
            start_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Validate the bind target and create a server with default options.
    pub fn bind(address: &str, port: u16, suffix: &str, handler: H) -> Result<Self, ServerError> {
        let target = BindTarget::new(address, port, suffix)?;
        Ok(Self::new(target, handler, ServerOptions::default()))
    }

    /// Begin accepting connections.
    ///
    /// Idempotent while listening. Fails with [`ServerError::Closed`] once
    /// the server has been closed.
    pub async fn start(&self) -> Result<(), ServerError> {
        let _starting = self.start_gate.lock().await;
        let retired = {
            let mut lifecycle = self.lock();
            match lifecycle.state {
                ServerState::Closed => return Err(ServerError::Closed),
                ServerState::Listening => return Ok(()),
                _ => lifecycle.retired.take(),
            }
        };

        // The previous loop must release the port before it can be rebound.
        // It drains its connections first.
        if let Some(task) = retired {
            let _ = task.await;
        }

        let listener = Listener::bind(&self.target, self.max_connections).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind {
                address: self.target.prefix(),
                source,
            })?;

        let mut lifecycle = self.lock();
        // `close` may have run while we were binding.
        let Some(next) = lifecycle.state.on_start() else {
            return Err(ServerError::Closed);
        };

        let shutdown = Shutdown::new();
        let disposed = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.scope),
            shutdown.subscribe(),
            Arc::clone(&disposed),
        ));

        lifecycle.active = Some(AcceptLoop {
            shutdown,
            disposed,
            local_addr,
            task,
        });
        lifecycle.state = next;

        tracing::info!(url = %self.target.prefix(), address = %local_addr, "Server listening");
        Ok(())
    }

    /// Stop accepting connections. Safe to call in any state.
    ///
    /// Open connections finish their in-flight request and are then closed.
    /// Requests arriving on them afterwards are refused.
    pub fn stop(&self) {
        let mut lifecycle = self.lock();
        if !lifecycle.state.is_listening() {
            return;
        }

        if let Some(active) = lifecycle.active.take() {
            lifecycle.retired = Some(active.retire());
        }
        lifecycle.state = lifecycle.state.on_stop();
        tracing::info!(url = %self.target.prefix(), "Server stopped");
    }

    /// Tear the server down for good, aborting any pending accept and every
    /// open connection.
    pub fn close(&self) {
        let mut lifecycle = self.lock();
        if lifecycle.state == ServerState::Closed {
            return;
        }

        if let Some(active) = lifecycle.active.take() {
            active.retire().abort();
        }
        if let Some(task) = lifecycle.retired.take() {
            task.abort();
        }
        lifecycle.state = lifecycle.state.on_close();
        tracing::info!(url = %self.target.prefix(), "Server closed");
    }

    pub fn state(&self) -> ServerState {
        self.lock().state
    }

    pub fn is_listening(&self) -> bool {
        self.state().is_listening()
    }

    /// The address actually bound, while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().active.as_ref().map(|active| active.local_addr)
    }

    /// The externally visible URL (`address:port` + suffix).
    pub fn url(&self) -> Result<Url, ConfigError> {
        self.target.url()
    }

    pub fn target(&self) -> &BindTarget {
        &self.target
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.scope.handler
    }

    /// Connections currently being served, across listening periods.
    pub fn active_connections(&self) -> u64 {
        self.scope.tracker.active_count()
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: RequestHandler> Drop for HttpServer<H> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn accept_loop<H: RequestHandler>(
    listener: Listener,
    scope: Arc<ConnectionScope<H>>,
    mut shutdown: broadcast::Receiver<()>,
    disposed: Arc<AtomicBool>,
) {
    // Dropped with this task, so aborting the loop aborts its connections.
    let mut connections = ConnectionSet::new(scope.tracker.clone());

    loop {
        let accepted = tokio::select! {
            _ = shutdown.recv() => break,
            Some(()) = connections.reap() => continue,
            accepted = listener.accept() => accepted,
        };

        // Subscribe before the disposal check: a trigger after this point
        // still reaches the connection.
        let connection_shutdown = shutdown.resubscribe();

        // Completion raced with teardown: drop it quietly.
        if disposed.load(Ordering::SeqCst) {
            tracing::debug!("Accept completed after teardown; dropping connection");
            break;
        }

        match accepted {
            Ok((stream, peer, permit)) => {
                let scope = Arc::clone(&scope);
                let disposed = Arc::clone(&disposed);
                connections.spawn(move |id| {
                    serve_connection(stream, peer, permit, id, scope, connection_shutdown, disposed)
                });
            }
            Err(ListenerError::LimitClosed) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
            }
        }
    }

    drop(listener);
    if !connections.is_empty() {
        tracing::debug!(connections = connections.len(), "Draining connections");
        connections.drain().await;
    }
    tracing::debug!("Accept loop exited");
}

async fn serve_connection<H: RequestHandler>(
    stream: TcpStream,
    peer: SocketAddr,
    permit: ConnectionPermit,
    id: ConnectionId,
    scope: Arc<ConnectionScope<H>>,
    mut shutdown: broadcast::Receiver<()>,
    disposed: Arc<AtomicBool>,
) {
    let service = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .service_fn(move |request: Request<Incoming>| {
            dispatch(Arc::clone(&scope), Arc::clone(&disposed), peer, request)
        });

    let builder = AutoBuilder::new(TokioExecutor::new());
    let connection = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));
    tokio::pin!(connection);

    let mut draining = false;
    loop {
        tokio::select! {
            result = connection.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %id, peer_addr = %peer, error = %e, "Connection ended with error");
                }
                break;
            }
            _ = shutdown.recv(), if !draining => {
                tracing::debug!(connection_id = %id, "Closing connection after in-flight request");
                draining = true;
                connection.as_mut().graceful_shutdown();
            }
        }
    }

    drop(permit);
}

async fn dispatch<H: RequestHandler>(
    scope: Arc<ConnectionScope<H>>,
    disposed: Arc<AtomicBool>,
    peer: SocketAddr,
    request: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, DispatchError> {
    if disposed.load(Ordering::SeqCst) {
        tracing::debug!(peer_addr = %peer, "Request after teardown; closing connection");
        return Err(DispatchError::Disposed);
    }

    let start_time = Instant::now();
    let method = request.method().clone();

    let Some(route_path) = scope.route_path(request.uri().path()) else {
        tracing::debug!(path = %request.uri().path(), "Path outside server suffix");
        return Ok(scope.finish(&method, OutgoingResponse::new(StatusCode::NOT_FOUND), start_time));
    };

    let incoming = match IncomingRequest::read(request, route_path, peer, scope.max_body_size).await {
        Ok(incoming) => incoming,
        Err(e) => {
            tracing::warn!(peer_addr = %peer, error = %e, "Failed to read request");
            return Ok(scope.finish(&method, OutgoingResponse::new(e.status()), start_time));
        }
    };

    let (writer, written) = ResponseWriter::channel();
    let handler = Arc::clone(&scope.handler);
    let worker = tokio::task::spawn_blocking(move || handler.handle_request(incoming, writer));

    let panicked = match worker.await {
        Ok(()) => false,
        Err(e) => {
            tracing::error!(error = %e, "Request handler panicked");
            true
        }
    };

    let response = match written.await {
        Ok(response) => response,
        Err(_) if panicked => OutgoingResponse::new(StatusCode::BAD_REQUEST),
        Err(_) => {
            tracing::debug!(method = %method, "Handler wrote no response; closing connection");
            return Err(DispatchError::Unanswered);
        }
    };

    Ok(scope.finish(&method, response, start_time))
}

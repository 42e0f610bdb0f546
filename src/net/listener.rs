//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Validate and hold the bind target (address, port, suffix)
//! - Bind the OS listener for one listening period
//! - Enforce max_connections limit via semaphore
//! - Graceful handling of accept errors

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use url::{Host, Url};

use crate::config::validation::{validate_address, validate_port, validate_suffix};
use crate::config::ConfigError;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
    /// The connection limit can no longer hand out slots.
    #[error("connection limit closed")]
    LimitClosed,
}

/// Where the server listens: scheme, host, port and path suffix.
///
/// Validated once at construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindTarget {
    address: String,
    host: String,
    port: u16,
    suffix: String,
}

impl BindTarget {
    /// Validate the parts of a bind target, failing on the first bad one.
    pub fn new(address: &str, port: u16, suffix: &str) -> Result<Self, ConfigError> {
        let url = validate_address(address)?;
        validate_port(port)?;
        validate_suffix(suffix)?;

        let host = match url.host() {
            Some(Host::Ipv6(ip)) => ip.to_string(),
            Some(host) => host.to_string(),
            None => String::new(),
        };

        Ok(Self {
            address: address.trim().trim_end_matches('/').to_string(),
            host,
            port,
            suffix: suffix.to_string(),
        })
    }

    /// The scheme and host, as given.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The host name or IP literal the listener binds to.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// `address:port` followed by the suffix.
    pub fn prefix(&self) -> String {
        format!("{}:{}{}", self.address, self.port, self.suffix)
    }

    /// The externally visible URL.
    ///
    /// Fails when the prefix does not form a URL, e.g. a suffix that does not
    /// start with '/'.
    pub fn url(&self) -> Result<Url, ConfigError> {
        let prefix = self.prefix();
        Url::parse(&prefix).map_err(|_| ConfigError::InvalidUrl(prefix))
    }

    /// The request path prefix served by this target, always rooted at '/'.
    pub fn path_prefix(&self) -> String {
        if self.suffix.starts_with('/') {
            self.suffix.clone()
        } else {
            format!("/{}", self.suffix)
        }
    }
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Bind to the target's host and port with connection limits.
    pub async fn bind(target: &BindTarget, max_connections: usize) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind((target.host(), target.port()))
            .await
            .map_err(|source| ListenerError::Bind {
                address: format!("{}:{}", target.host(), target.port()),
                source,
            })?;

        if let Ok(local_addr) = listener.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections,
                "Listener bound"
            );
        }

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached.
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::LimitClosed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

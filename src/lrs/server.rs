//! The embeddable LRS server.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::HeaderValue;
use url::Url;

use crate::config::schema::{DEFAULT_ALLOWED_ORIGIN, DEFAULT_SUFFIX};
use crate::config::{validate_config, ConfigError, LrsConfig, ValidationError};
use crate::http::{HttpServer, IncomingRequest, ResponseWriter, ServerError, ServerOptions};
use crate::lifecycle::ServerState;
use crate::lrs::activity_state::StateMethod;
use crate::lrs::delegate::LrsDelegate;
use crate::lrs::events::{AgentProfileReceived, BoxError, StatementReceived};
use crate::lrs::router::LrsRouter;
use crate::net::BindTarget;

/// A local xAPI Learning Record Store.
///
/// Hosts subscribe to statement and agent-profile events, register
/// activity-state callbacks, and optionally supply an [`LrsDelegate`].
///
/// ```no_run
/// # async fn run() -> Result<(), local_lrs::ServerError> {
/// let server = local_lrs::LrsServer::new("http://127.0.0.1", 8080, None)?;
/// server.on_statement_received(|event| {
///     println!("{:?}", event.statement.id());
///     Ok(())
/// });
/// server.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct LrsServer {
    server: HttpServer<LrsRouter>,
}

impl LrsServer {
    /// Create a server for `address` and `port` with the root suffix.
    ///
    /// `address` is an `http` URI without port or path, e.g.
    /// `http://127.0.0.1`. Nothing is bound until [`start`](Self::start).
    pub fn new(
        address: &str,
        port: u16,
        delegate: Option<Arc<dyn LrsDelegate>>,
    ) -> Result<Self, ServerError> {
        let target = BindTarget::new(address, port, DEFAULT_SUFFIX)?;
        let router = LrsRouter::new(delegate, HeaderValue::from_static(DEFAULT_ALLOWED_ORIGIN));
        Ok(Self {
            server: HttpServer::new(target, router, ServerOptions::default()),
        })
    }

    /// Create a server from a loaded configuration.
    pub fn from_config(
        config: &LrsConfig,
        delegate: Option<Arc<dyn LrsDelegate>>,
    ) -> Result<Self, ServerError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let listener = &config.listener;
        let target = BindTarget::new(&listener.address, listener.port, &listener.suffix)?;
        let origin = HeaderValue::from_str(&config.cors.default_origin).map_err(|_| {
            ConfigError::from(ValidationError::InvalidOrigin(
                config.cors.default_origin.clone(),
            ))
        })?;

        let router = LrsRouter::new(delegate, origin);
        Ok(Self {
            server: HttpServer::new(target, router, ServerOptions::from(listener)),
        })
    }

    /// Begin listening. Idempotent; fails once the server is closed.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.server.start().await
    }

    /// Stop listening. The server can be started again.
    pub fn stop(&self) {
        self.server.stop();
    }

    /// Tear down for good. Also happens on drop.
    pub fn close(&self) {
        self.server.close();
    }

    pub fn is_listening(&self) -> bool {
        self.server.is_listening()
    }

    pub fn state(&self) -> ServerState {
        self.server.state()
    }

    /// `address:port` + suffix, e.g. `http://127.0.0.1:8080/`.
    pub fn url(&self) -> Result<Url, ConfigError> {
        self.server.url()
    }

    /// The URL as a single form-encoded component, for embedding in a
    /// launch link's `endpoint` parameter.
    pub fn encoded_url(&self) -> String {
        url::form_urlencoded::byte_serialize(self.server.target().prefix().as_bytes()).collect()
    }

    /// The address actually bound, while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    pub fn active_connections(&self) -> u64 {
        self.server.active_connections()
    }

    pub fn router(&self) -> &LrsRouter {
        self.server.handler()
    }

    /// Observe each received statement after its id and timestamp are set.
    ///
    /// An observer error fails the request with 400.
    pub fn on_statement_received<F>(&self, observer: F)
    where
        F: Fn(&StatementReceived) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.router().statement_observers().subscribe(observer);
    }

    /// Observe each agent profile document posted or put.
    pub fn on_agent_profile_received<F>(&self, observer: F)
    where
        F: Fn(&AgentProfileReceived) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.router().profile_observers().subscribe(observer);
    }

    /// Answer activity-state requests for `method` with `callback`.
    pub fn set_state_handler<F>(&self, method: StateMethod, callback: F)
    where
        F: Fn(IncomingRequest, ResponseWriter) + Send + Sync + 'static,
    {
        self.router().state_handlers().set(method, callback);
    }

    pub fn clear_state_handler(&self, method: StateMethod) {
        self.router().state_handlers().clear(method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        let server = LrsServer::new("http://127.0.0.1", 8080, None).unwrap();
        assert_eq!(server.url().unwrap().as_str(), "http://127.0.0.1:8080/");
        assert_eq!(server.encoded_url(), "http%3A%2F%2F127.0.0.1%3A8080%2F");
        assert_eq!(server.state(), ServerState::Uninitialized);
    }

    #[test]
    fn construction_rejects_bad_targets() {
        for (address, port) in [("", 8080), ("aaaa", 8080), ("float://www.test.com", 8080)] {
            assert!(matches!(
                LrsServer::new(address, port, None),
                Err(ServerError::Config(_))
            ));
        }
        assert!(LrsServer::new("http://127.0.0.1", 1000, None).is_err());
    }

    #[test]
    fn from_config_uses_suffix_and_origin() {
        let mut config = LrsConfig::default();
        config.listener.port = 9000;
        config.listener.suffix = "/lrs/".into();
        config.cors.default_origin = "http://host".into();

        let server = LrsServer::from_config(&config, None).unwrap();
        assert_eq!(server.url().unwrap().as_str(), "http://127.0.0.1:9000/lrs/");

        config.listener.max_body_size = 0;
        assert!(matches!(
            LrsServer::from_config(&config, None),
            Err(ServerError::Config(ConfigError::Validation(_)))
        ));
    }

    #[test]
    fn registrations_reach_the_router() {
        let server = LrsServer::new("http://127.0.0.1", 8080, None).unwrap();
        server.on_statement_received(|_| Ok(()));
        server.on_agent_profile_received(|_| Ok(()));
        server.set_state_handler(StateMethod::Delete, |_, writer| writer.close());

        let router = server.router();
        assert_eq!(router.statement_observers().len(), 1);
        assert_eq!(router.profile_observers().len(), 1);
        assert!(router.state_handlers().is_registered(StateMethod::Delete));

        server.clear_state_handler(StateMethod::Delete);
        assert!(!router.state_handlers().is_registered(StateMethod::Delete));
    }
}

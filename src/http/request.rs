//! Request handling.
//!
//! # Responsibilities
//! - Read the full request body (bounded by `max_body_size`)
//! - Decode query parameters once
//! - Hand handlers an owned, runtime-free view of the request
//!
//! # Design Decisions
//! - The body is collected before the handler runs, so handlers stay synchronous
//! - Original URI preserved; the route path is relative to the bind suffix

use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode, Uri};
use thiserror::Error;

/// Failure while reading a request off the wire.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("failed to read request body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RequestError {
    /// Status code used to answer the failed read.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// A fully read HTTP request.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    method: Method,
    uri: Uri,
    route_path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl IncomingRequest {
    /// Build a request by hand. The route path is the URI path.
    pub fn new(method: Method, uri: Uri) -> Self {
        let route_path = uri.path().to_string();
        let query = decode_query(uri.query());
        Self {
            method,
            uri,
            route_path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Append a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Read a hyper request, collecting its body.
    pub(crate) async fn read(
        request: Request<Incoming>,
        route_path: String,
        remote_addr: SocketAddr,
        max_body_size: usize,
    ) -> Result<Self, RequestError> {
        let (parts, body) = request.into_parts();

        let body = Limited::new(body, max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    RequestError::BodyTooLarge(max_body_size)
                } else {
                    RequestError::Body(e)
                }
            })?
            .to_bytes();

        Ok(Self {
            query: decode_query(parts.uri.query()),
            method: parts.method,
            uri: parts.uri,
            route_path,
            headers: parts.headers,
            body,
            remote_addr: Some(remote_addr),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The full request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The path relative to the server's suffix, always starting with '/'.
    pub fn route_path(&self) -> &str {
        &self.route_path
    }

    /// First decoded value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All decoded query parameters in request order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

fn decode_query(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_query_parameters() {
        let request = IncomingRequest::new(
            Method::GET,
            "/agents/profile?profileId=a%20b&agent=%7B%22name%22%3A%22x%22%7D&empty="
                .parse()
                .unwrap(),
        );

        assert_eq!(request.query_param("profileId"), Some("a b"));
        assert_eq!(request.query_param("agent"), Some(r#"{"name":"x"}"#));
        assert_eq!(request.query_param("empty"), Some(""));
        assert_eq!(request.query_param("missing"), None);
        assert_eq!(request.query_pairs().len(), 3);
        assert_eq!(request.path(), "/agents/profile");
        assert_eq!(request.route_path(), "/agents/profile");
    }

    #[test]
    fn exposes_body_and_content_type() {
        let request = IncomingRequest::new(Method::PUT, "/statements".parse().unwrap())
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body("{}");

        assert_eq!(request.content_type(), Some("application/json"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body().as_ref(), b"{}");
        assert_eq!(request.remote_addr(), None);
    }

    #[test]
    fn read_errors_map_to_status() {
        assert_eq!(
            RequestError::BodyTooLarge(10).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            RequestError::Body("reset".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}

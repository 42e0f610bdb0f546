//! Response construction and the write-once response channel.
//!
//! # Responsibilities
//! - Accumulate status, headers and body for one request
//! - Deliver exactly one response back to the connection task
//!
//! # Design Decisions
//! - `ResponseWriter` is consumed by every write, so a second write does not compile
//! - A writer dropped without writing means "nothing written": the connection
//!   is closed without a response

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use tokio::sync::oneshot;

/// Media types the server writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
        }
    }

    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

/// Status, headers and body of a response that has not been sent yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl OutgoingResponse {
    /// An empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.headers.insert(CONTENT_TYPE, content_type.header_value());
    }

    pub(crate) fn into_http(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// The single write handle for one request.
#[derive(Debug)]
pub struct ResponseWriter {
    response: OutgoingResponse,
    sink: oneshot::Sender<OutgoingResponse>,
}

impl ResponseWriter {
    /// Create a writer and the receiver its response is delivered to.
    ///
    /// The server creates one per request; hosts can use it to drive their
    /// state callbacks in tests.
    pub fn channel() -> (Self, oneshot::Receiver<OutgoingResponse>) {
        let (sink, written) = oneshot::channel();
        let writer = Self {
            response: OutgoingResponse::default(),
            sink,
        };
        (writer, written)
    }

    /// The response accumulated so far.
    pub fn response(&self) -> &OutgoingResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut OutgoingResponse {
        &mut self.response
    }

    /// Set a header, replacing any previous value.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response.headers.insert(name, value);
    }

    /// Swap the pending response for another, returning the old one.
    pub fn replace_response(&mut self, response: OutgoingResponse) -> OutgoingResponse {
        std::mem::replace(&mut self.response, response)
    }

    /// Send the pending headers with `status` and an empty body.
    pub fn send(mut self, status: StatusCode) {
        self.response.status = status;
        self.response.body = Bytes::new();
        self.close();
    }

    /// Send `body` with `status`, labelled with `content_type` when given.
    pub fn write(mut self, body: impl Into<Bytes>, content_type: Option<ContentType>, status: StatusCode) {
        if let Some(content_type) = content_type {
            self.response.set_content_type(content_type);
        }
        self.response.status = status;
        self.response.body = body.into();
        self.close();
    }

    /// Send the pending response as it stands.
    pub fn close(self) {
        if self.sink.send(self.response).is_err() {
            tracing::debug!("Response dropped; connection already gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::ACCESS_CONTROL_ALLOW_ORIGIN;

    #[test]
    fn send_keeps_headers_and_clears_body() {
        let (mut writer, mut written) = ResponseWriter::channel();
        writer.insert_header(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("file://"));
        writer.response_mut().set_body("stale");
        writer.send(StatusCode::NO_CONTENT);

        let response = written.try_recv().unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "file://");
    }

    #[test]
    fn write_sets_body_and_content_type() {
        let (writer, mut written) = ResponseWriter::channel();
        writer.write("[\"a\"]", Some(ContentType::Json), StatusCode::OK);

        let response = written.try_recv().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"[\"a\"]");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn dropped_writer_writes_nothing() {
        let (writer, mut written) = ResponseWriter::channel();
        drop(writer);
        assert!(written.try_recv().is_err());
    }

    #[test]
    fn replace_response_returns_previous() {
        let (mut writer, mut written) = ResponseWriter::channel();
        writer.insert_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let mut replacement = OutgoingResponse::new(StatusCode::ACCEPTED);
        replacement.set_body("new");
        let previous = writer.replace_response(replacement);
        assert_eq!(previous.headers()[CONTENT_TYPE], "text/plain");

        writer.close();
        let response = written.try_recv().unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.body().as_ref(), b"new");
    }

    #[test]
    fn converts_to_http_response() {
        let mut outgoing = OutgoingResponse::new(StatusCode::CREATED);
        outgoing.set_content_type(ContentType::Json);
        let response = outgoing.into_http();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }
}

mod common;

use std::sync::Arc;

use local_lrs::{
    AgentProfileDocument, IncomingRequest, LrsDelegate, ProfileAlteration, StateMethod,
};
use reqwest::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use reqwest::{Method, StatusCode};

use common::{client, start_server, url};

struct FixedOrigin(&'static str);

impl LrsDelegate for FixedOrigin {
    fn agent_profile_document(&self, _profile_id: &str) -> Option<AgentProfileDocument> {
        None
    }

    fn access_control_allow_origin(&self) -> Option<String> {
        Some(self.0.to_string())
    }

    fn alter_agent_profile_response(
        &self,
        _request: &IncomingRequest,
        alteration: ProfileAlteration,
    ) -> ProfileAlteration {
        alteration
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn preflight_on_any_path() {
    let port = 28_130;
    let server = start_server(port, None).await;
    let client = client();

    for path in ["/statements", "/activities/state", "/agents/profile", "/anything/else"] {
        let response = client
            .request(Method::OPTIONS, url(port, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "path {path}");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, DELETE, PUT"
        );
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            local_lrs::lrs::ALLOWED_HEADERS
        );
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "file://");
    }

    server.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_paths_are_no_content() {
    let port = 28_131;
    let server = start_server(port, None).await;
    let client = client();

    for path in ["/", "/statement", "/statements/extra", "/about"] {
        let response = client.get(url(port, path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT, "path {path}");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "file://");
    }

    server.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn responses_carry_a_request_id() {
    let port = 28_132;
    let server = start_server(port, None).await;

    let response = client().get(url(port, "/")).send().await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let response = client()
        .get(url(port, "/"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");

    server.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn delegate_supplies_the_origin() {
    let port = 28_133;
    let server = start_server(port, Some(Arc::new(FixedOrigin("http://lms.example.com")))).await;
    let client = client();

    let response = client.get(url(port, "/statements")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://lms.example.com"
    );

    let response = client
        .request(Method::OPTIONS, url(port, "/statements"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://lms.example.com"
    );
    server.close();

    let port = 28_134;
    let server = start_server(port, Some(Arc::new(FixedOrigin("")))).await;
    let response = client.get(url(port, "/")).send().await.unwrap();
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "file://");
    server.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn state_requests_go_to_callbacks() {
    let port = 28_135;
    let server = start_server(port, None).await;

    server.set_state_handler(StateMethod::Get, |request, writer| {
        let state_id = request.query_param("stateId").unwrap_or("none").to_string();
        writer.write(state_id, None, StatusCode::OK);
    });
    server.set_state_handler(StateMethod::Put, |request, writer| {
        let status = if request.body().is_empty() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::NO_CONTENT
        };
        writer.send(status);
    });

    let response = client()
        .get(url(port, "/activities/state?stateId=bookmark"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "file://");
    assert_eq!(response.text().await.unwrap(), "bookmark");

    let response = client()
        .put(url(port, "/activities/state?stateId=bookmark"))
        .body("page-3")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    server.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn state_without_callback_closes_the_connection() {
    let port = 28_136;
    let server = start_server(port, None).await;

    let result = client()
        .post(url(port, "/activities/state?stateId=s"))
        .body("x")
        .send()
        .await;
    assert!(result.is_err());

    server.set_state_handler(StateMethod::Post, |_, writer| writer.send(StatusCode::NO_CONTENT));
    let response = client()
        .post(url(port, "/activities/state?stateId=s"))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    server.clear_state_handler(StateMethod::Post);
    let result = client()
        .post(url(port, "/activities/state?stateId=s"))
        .body("x")
        .send()
        .await;
    assert!(result.is_err());

    server.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn handler_panic_is_bad_request() {
    let port = 28_137;
    let server = start_server(port, None).await;
    server.set_state_handler(StateMethod::Delete, |_, _writer| panic!("host callback failed"));

    let response = client()
        .delete(url(port, "/activities/state?stateId=s"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "file://");

    server.close();
}

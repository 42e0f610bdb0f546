//! The `/statements` resource.

use hyper::{Method, StatusCode};
use serde_json::Value;

use crate::http::IncomingRequest;
use crate::lrs::events::{Observers, StatementReceived};
use crate::lrs::{LrsError, Reply};
use crate::observability::metrics;
use crate::xapi::Statement;

/// Parse, stamp and publish the statements carried by any non-GET request.
///
/// The whole body is parsed before any observer runs, so a malformed batch
/// publishes nothing. PUT and POST are answered; other methods publish and
/// then leave the request unanswered.
pub(crate) fn handle(
    request: &IncomingRequest,
    observers: &Observers<StatementReceived>,
) -> Result<Reply, LrsError> {
    let method = request.method();
    if *method == Method::GET {
        return Err(LrsError::NotImplemented("statement retrieval"));
    }
    let statements = Statement::parse_batch(request.body())?;
    let mut ids = Vec::with_capacity(statements.len());
    for mut statement in statements {
        ids.push(statement.stamp().to_string());
        observers
            .notify(&StatementReceived { statement })
            .map_err(LrsError::Observer)?;
    }
    metrics::record_statements(ids.len());
    tracing::debug!(count = ids.len(), "Statements received");

    match *method {
        Method::PUT => Ok(Reply::Status(StatusCode::NO_CONTENT)),
        Method::POST => Ok(Reply::Json(StatusCode::OK, Value::from(ids).to_string().into())),
        _ => Ok(Reply::Unanswered),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::xapi::ParseError;

    fn recording() -> (Observers<StatementReceived>, Arc<Mutex<Vec<Statement>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observers = Observers::new();
        let sink = Arc::clone(&seen);
        observers.subscribe(move |event: &StatementReceived| {
            sink.lock().unwrap().push(event.statement.clone());
            Ok(())
        });
        (observers, seen)
    }

    fn request(method: Method, body: &'static str) -> IncomingRequest {
        IncomingRequest::new(method, "/statements".parse().unwrap()).with_body(body)
    }

    #[test]
    fn post_returns_stamped_ids_in_order() {
        let (observers, seen) = recording();
        let reply = handle(
            &request(Method::POST, r#"[{"verb":{"id":"a"}},{"verb":{"id":"b"}}]"#),
            &observers,
        )
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].get("verb").unwrap()["id"], "a");
        assert_eq!(seen[1].get("verb").unwrap()["id"], "b");

        let Reply::Json(status, body) = reply else {
            panic!("expected a JSON reply");
        };
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<String> = serde_json::from_slice(&body).unwrap();
        let stamped: Vec<String> = seen.iter().map(|s| s.id().unwrap().to_string()).collect();
        assert_eq!(ids, stamped);
        assert!(seen.iter().all(|s| s.timestamp().is_some()));
    }

    #[test]
    fn put_answers_no_content() {
        let (observers, seen) = recording();
        let reply = handle(&request(Method::PUT, r#"{"actor":{}}"#), &observers).unwrap();
        assert!(matches!(reply, Reply::Status(StatusCode::NO_CONTENT)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn get_is_not_implemented() {
        let (observers, _) = recording();
        let err = handle(&request(Method::GET, ""), &observers).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn other_methods_publish_without_answering() {
        let (observers, seen) = recording();
        let reply = handle(&request(Method::DELETE, r#"{"verb":{"id":"d"}}"#), &observers).unwrap();
        assert!(matches!(reply, Reply::Unanswered));

        let reply = handle(&request(Method::PATCH, "[{},{}]"), &observers).unwrap();
        assert!(matches!(reply, Reply::Unanswered));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].get("verb").unwrap()["id"], "d");
        assert!(seen.iter().all(|s| s.id().is_some()));
    }

    #[test]
    fn other_methods_still_reject_malformed_bodies() {
        let (observers, seen) = recording();
        let err = handle(&request(Method::DELETE, "not json"), &observers).unwrap_err();
        assert!(matches!(err, LrsError::Payload(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_batch_publishes_nothing() {
        let (observers, seen) = recording();
        let err = handle(&request(Method::POST, r#"[{"id":"a"},{]"#), &observers).unwrap_err();
        assert!(matches!(err, LrsError::Payload(ParseError::Json(_))));

        let err = handle(&request(Method::POST, r#"[{},{"id":"nope"}]"#), &observers).unwrap_err();
        assert!(matches!(err, LrsError::Payload(ParseError::InvalidId(_))));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn observer_failure_fails_the_request() {
        let observers = Observers::<StatementReceived>::new();
        observers.subscribe(|_| Err("disk full".into()));
        let err = handle(&request(Method::POST, "{}"), &observers).unwrap_err();
        assert!(matches!(err, LrsError::Observer(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

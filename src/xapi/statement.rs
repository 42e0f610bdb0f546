use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::ParseError;

/// An xAPI statement, kept as its raw JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statement(Map<String, Value>);

impl Statement {
    /// Wrap a JSON value. Objects only; a present `id` must be a UUID.
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let Value::Object(map) = value else {
            return Err(ParseError::UnexpectedPayload);
        };
        let statement = Self(map);
        match statement.0.get("id") {
            None | Some(Value::Null) => {}
            Some(Value::String(id)) if Uuid::parse_str(id).is_ok() => {}
            Some(other) => {
                let id = other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string());
                return Err(ParseError::InvalidId(id));
            }
        }
        Ok(statement)
    }

    /// Parse a request body holding one statement object or an array of them.
    ///
    /// Every element is checked before any is returned.
    pub fn parse_batch(body: &[u8]) -> Result<Vec<Self>, ParseError> {
        match serde_json::from_slice::<Value>(body)? {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            object @ Value::Object(_) => Ok(vec![Self::from_value(object)?]),
            _ => Err(ParseError::UnexpectedPayload),
        }
    }

    /// The statement id, if one is set.
    pub fn id(&self) -> Option<Uuid> {
        self.0
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok())
    }

    /// Fill in a generated id and the current timestamp where missing.
    ///
    /// Returns the statement id.
    pub fn stamp(&mut self) -> Uuid {
        if self.timestamp().is_none() {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            self.0.insert("timestamp".to_string(), Value::String(now));
        }

        match self.id() {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                self.0.insert("id".to_string(), Value::String(id.to_string()));
                id
            }
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.0.get("timestamp").and_then(Value::as_str)
    }

    /// A top-level property such as `actor`, `verb` or `object`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STATEMENT: &str = r#"{
        "actor": {"mbox": "mailto:test@user.com"},
        "verb": {"id": "http://adlnet.gov/expapi/verbs/experienced"},
        "object": {"id": "http://example.com/activity"}
    }"#;

    #[test]
    fn parses_single_object() {
        let statements = Statement::parse_batch(STATEMENT.as_bytes()).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].id(), None);
        assert_eq!(
            statements[0].get("verb").and_then(|v| v.get("id")),
            Some(&json!("http://adlnet.gov/expapi/verbs/experienced"))
        );
    }

    #[test]
    fn parses_array_in_order() {
        let body = json!([
            {"id": "6690e6c9-3ef0-4ed3-8b37-7f3964730bee", "n": 1},
            {"n": 2},
            {"n": 3}
        ]);
        let statements = Statement::parse_batch(body.to_string().as_bytes()).unwrap();
        let order: Vec<_> = statements.iter().map(|s| s.get("n").cloned()).collect();
        assert_eq!(order, vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]);
        assert_eq!(
            statements[0].id().map(|id| id.to_string()).as_deref(),
            Some("6690e6c9-3ef0-4ed3-8b37-7f3964730bee")
        );
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(
            Statement::parse_batch(b"\"hello\""),
            Err(ParseError::UnexpectedPayload)
        ));
        assert!(matches!(
            Statement::parse_batch(b"[{}, 5]"),
            Err(ParseError::UnexpectedPayload)
        ));
        assert!(matches!(
            Statement::parse_batch(b"{not json"),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(Statement::parse_batch(b""), Err(ParseError::Json(_))));
    }

    #[test]
    fn rejects_invalid_ids() {
        assert!(matches!(
            Statement::from_value(json!({"id": "nope"})),
            Err(ParseError::InvalidId(id)) if id == "nope"
        ));
        assert!(matches!(
            Statement::from_value(json!({"id": 12})),
            Err(ParseError::InvalidId(id)) if id == "12"
        ));
        assert!(Statement::from_value(json!({"id": null})).is_ok());
    }

    #[test]
    fn stamp_assigns_missing_id_and_timestamp() {
        let mut statement = Statement::from_value(json!({"verb": {}})).unwrap();
        let id = statement.stamp();
        assert_eq!(statement.id(), Some(id));
        assert!(statement.timestamp().is_some());

        let again = statement.stamp();
        assert_eq!(again, id);
    }

    #[test]
    fn stamp_keeps_existing_values() {
        let mut statement = Statement::from_value(json!({
            "id": "6690e6c9-3ef0-4ed3-8b37-7f3964730bee",
            "timestamp": "2020-01-01T00:00:00Z"
        }))
        .unwrap();
        let id = statement.stamp();
        assert_eq!(id.to_string(), "6690e6c9-3ef0-4ed3-8b37-7f3964730bee");
        assert_eq!(statement.timestamp(), Some("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn serializes_as_plain_object() {
        let statement = Statement::from_value(json!({"verb": {"id": "v"}})).unwrap();
        assert_eq!(serde_json::to_value(&statement).unwrap(), json!({"verb": {"id": "v"}}));
        assert_eq!(statement.into_json(), json!({"verb": {"id": "v"}}));
    }
}

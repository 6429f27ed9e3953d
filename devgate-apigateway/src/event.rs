//! Invocation event construction

use axum::http::{HeaderMap, Method};
use devgate_core::{ErrorCode, StageContext};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::matcher::RouteMatch;

/// A query string value; keys given more than once collect into a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                *self = Self::Multiple(vec![std::mem::take(first), value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventParams {
    pub path: BTreeMap<String, String>,
    pub querystring: BTreeMap<String, QueryValue>,
    pub header: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMeta {
    #[serde(rename = "expectedResponseContentType")]
    pub expected_response_content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizerPrincipal {
    #[serde(rename = "principalId")]
    pub principal_id: Value,
}

/// The normalized request handed to a handler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationEvent {
    pub params: EventParams,
    pub body: Value,
    pub meta: EventMeta,
    #[serde(rename = "stageVariables")]
    pub stage_variables: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<AuthorizerPrincipal>,
}

impl InvocationEvent {
    pub fn build(
        headers: &HeaderMap,
        query: Option<&str>,
        route: &RouteMatch,
        stage: &StageContext,
        body: Value,
    ) -> Self {
        Self {
            params: EventParams {
                path: route.path_parameters.clone(),
                querystring: parse_query(query),
                header: collect_headers(headers),
            },
            body,
            meta: EventMeta {
                expected_response_content_type: route
                    .definition
                    .expected_response_content_type()
                    .to_string(),
            },
            stage_variables: stage.outputs.clone(),
            authorizer: None,
        }
    }

    pub fn with_principal(mut self, principal_id: Value) -> Self {
        self.authorizer = Some(AuthorizerPrincipal { principal_id });
        self
    }
}

/// Whether a request with this method has a payload worth reading
pub fn expects_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Decode a request payload as JSON, falling back to an empty object
pub fn parse_body(raw: &[u8]) -> Value {
    let text = String::from_utf8_lossy(raw);
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                code = %ErrorCode::BodyParseFailure,
                error = %e,
                body = %text,
                "Could not parse request body as JSON, using an empty object"
            );
            empty_body()
        }
    }
}

pub fn empty_body() -> Value {
    Value::Object(Map::new())
}

fn parse_query(query: Option<&str>) -> BTreeMap<String, QueryValue> {
    let mut params: BTreeMap<String, QueryValue> = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        let value = value.into_owned();
        match params.get_mut(key.as_ref()) {
            Some(existing) => existing.push(value),
            None => {
                params.insert(key.into_owned(), QueryValue::Single(value));
            }
        }
    }
    params
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected = BTreeMap::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        collected.insert(name.as_str().to_string(), joined);
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ApiDefinition;
    use axum::http::HeaderValue;
    use serde_json::json;
    use std::sync::Arc;

    fn route(definition: ApiDefinition, params: &[(&str, &str)]) -> RouteMatch {
        RouteMatch {
            definition: Arc::new(definition),
            path_parameters: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    fn stage() -> StageContext {
        let mut outputs = BTreeMap::new();
        outputs.insert("TableName".to_string(), "users-dev".to_string());
        StageContext::new(outputs, Vec::new())
    }

    #[test]
    fn test_event_wire_shape() {
        let mut headers = HeaderMap::new();
        headers.insert("x-client", HeaderValue::from_static("cli"));

        let event = InvocationEvent::build(
            &headers,
            Some("page=2"),
            &route(ApiDefinition::new("getUser", "users/{id}"), &[("id", "42")]),
            &stage(),
            json!({"name": "ada"}),
        );

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "params": {
                    "path": {"id": "42"},
                    "querystring": {"page": "2"},
                    "header": {"x-client": "cli"}
                },
                "body": {"name": "ada"},
                "meta": {"expectedResponseContentType": "text/html"},
                "stageVariables": {"TableName": "users-dev"}
            })
        );
    }

    #[test]
    fn test_principal_is_attached() {
        let event = InvocationEvent::build(
            &HeaderMap::new(),
            None,
            &route(ApiDefinition::new("me", "me"), &[]),
            &StageContext::default(),
            empty_body(),
        )
        .with_principal(json!("user|123"));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["authorizer"], json!({"principalId": "user|123"}));
    }

    #[test]
    fn test_repeated_query_keys_become_lists() {
        let query = parse_query(Some("tag=a&tag=b&tag=c&q=hello%20world"));
        assert_eq!(
            query["tag"],
            QueryValue::Multiple(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(query["q"], QueryValue::Single("hello world".into()));
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        let collected = collect_headers(&headers);
        assert_eq!(collected["accept"], "text/html, application/json");
    }

    #[test]
    fn test_redirect_definitions_expect_plain_text() {
        let event = InvocationEvent::build(
            &HeaderMap::new(),
            None,
            &route(
                ApiDefinition::new("login", "login")
                    .with_content_type("application/json")
                    .with_redirects(),
                &[],
            ),
            &StageContext::default(),
            empty_body(),
        );
        assert_eq!(event.meta.expected_response_content_type, "text/plain");
    }

    #[test]
    fn test_body_parsing() {
        assert_eq!(parse_body(br#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_body(b"not json"), json!({}));
        assert_eq!(parse_body(b""), json!({}));
    }

    #[test]
    fn test_body_expected_only_for_mutating_methods() {
        assert!(!expects_body(&Method::GET));
        assert!(!expects_body(&Method::HEAD));
        assert!(!expects_body(&Method::OPTIONS));
        assert!(expects_body(&Method::POST));
        assert!(expects_body(&Method::DELETE));
    }
}

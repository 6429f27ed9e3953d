//! Response rendering

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use devgate_core::{ErrorCode, GatewayError};
use devgate_lambda::InvocationOutcome;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::definition::ApiDefinition;

/// Write an invocation outcome the way the deployed gateway would
pub fn render(outcome: InvocationOutcome, definition: &ApiDefinition) -> Response {
    let content_type = definition.content_type();

    match outcome {
        InvocationOutcome::Success { payload } if definition.redirects => {
            render_redirect(&payload, &definition.name)
        }
        InvocationOutcome::Success { payload } => {
            if payload.is_null() {
                error!(
                    route = %definition.name,
                    code = %ErrorCode::EmptyResponsePayload,
                    "Handler returned an empty body"
                );
                return respond(StatusCode::OK, content_type, String::new());
            }
            let field = if content_type == "text/html" {
                "html"
            } else {
                "response"
            };
            let body = field_text(payload.get(field));
            info!(route = %definition.name, size_kb = body.len() / 1024, "<- END");
            respond(StatusCode::OK, content_type, body)
        }
        InvocationOutcome::HandledError { http_status, body } => {
            if body.get("unhandled").and_then(Value::as_bool) == Some(true) {
                warn!(route = %definition.name, "Handler reported an unhandled error");
            }
            let status = StatusCode::from_u16(http_status)
                .ok()
                .filter(|s| (100..600).contains(&s.as_u16()))
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let text = if content_type == "application/json" {
                body.to_string()
            } else {
                field_text(body.get("response"))
            };
            info!(route = %definition.name, status = status.as_u16(), "<- END (error)");
            respond(status, content_type, text)
        }
        InvocationOutcome::UnhandledError { reason } => {
            error!(
                route = %definition.name,
                code = %ErrorCode::UnhandledInvocationError,
                reason = %reason,
                "Handler failed without a response"
            );
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                "Internal Server Error".to_string(),
            )
        }
    }
}

/// Response for a pipeline failure
pub fn render_error(err: &GatewayError) -> Response {
    let status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match err.code {
        ErrorCode::AuthorizationMissing | ErrorCode::AuthorizationDenied => {
            respond(status, "application/json", err.to_json())
        }
        _ => respond(status, "text/plain", err.message.clone()),
    }
}

fn render_redirect(payload: &Value, route: &str) -> Response {
    let Some(location) = payload.pointer("/response/Location").and_then(Value::as_str) else {
        error!(route = %route, "Redirect handler returned no Location");
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain",
            "Internal Server Error".to_string(),
        );
    };
    let Ok(location_header) = HeaderValue::from_str(location) else {
        error!(route = %route, location = %location, "Redirect Location is not a valid header");
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain",
            "Internal Server Error".to_string(),
        );
    };

    info!(route = %route, location = %location, "<- END (redirect)");
    (
        StatusCode::TEMPORARY_REDIRECT,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/plain")),
            (header::LOCATION, location_header),
        ],
        format!("You are being redirected to {location}"),
    )
        .into_response()
}

/// Strings verbatim, other values as JSON text, nothing for null/absent
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn respond(status: StatusCode, content_type: &str, body: String) -> Response {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_html_success_writes_html_field() {
        let response = render(
            InvocationOutcome::Success {
                payload: json!({"html": "<h1>hi</h1>", "response": "ignored"}),
            },
            &ApiDefinition::new("home", ""),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "text/html");
        assert_eq!(body_text(response).await, "<h1>hi</h1>");
    }

    #[tokio::test]
    async fn test_json_success_writes_response_field() {
        let definition = ApiDefinition::new("list", "users").with_content_type("application/json");
        let response = render(
            InvocationOutcome::Success {
                payload: json!({"response": "{\"users\":[]}"}),
            },
            &definition,
        );
        assert_eq!(content_type(&response), "application/json");
        assert_eq!(body_text(response).await, r#"{"users":[]}"#);

        let structured = render(
            InvocationOutcome::Success {
                payload: json!({"response": {"users": []}}),
            },
            &definition,
        );
        assert_eq!(body_text(structured).await, r#"{"users":[]}"#);
    }

    #[tokio::test]
    async fn test_other_content_types_write_response_field() {
        let response = render(
            InvocationOutcome::Success {
                payload: json!({"response": "a,b"}),
            },
            &ApiDefinition::new("csv", "export").with_content_type("text/csv"),
        );
        assert_eq!(content_type(&response), "text/csv");
        assert_eq!(body_text(response).await, "a,b");
    }

    #[tokio::test]
    async fn test_plain_text_success_writes_response_field() {
        let response = render(
            InvocationOutcome::Success {
                payload: json!({"response": "pong", "html": "<p>ignored</p>"}),
            },
            &ApiDefinition::new("ping", "ping").with_content_type("text/plain"),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "text/plain");
        assert_eq!(body_text(response).await, "pong");
    }

    #[tokio::test]
    async fn test_empty_payload_is_empty_ok() {
        let response = render(
            InvocationOutcome::Success {
                payload: Value::Null,
            },
            &ApiDefinition::new("noop", "noop"),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_redirect() {
        let response = render(
            InvocationOutcome::Success {
                payload: json!({"response": {"Location": "https://example.com/next"}}),
            },
            &ApiDefinition::new("login", "login").with_redirects(),
        );
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(content_type(&response), "text/plain");
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://example.com/next"
        );
        assert_eq!(
            body_text(response).await,
            "You are being redirected to https://example.com/next"
        );
    }

    #[tokio::test]
    async fn test_redirect_ignores_configured_content_type() {
        let response = render(
            InvocationOutcome::Success {
                payload: json!({"response": {"Location": "/dashboard"}}),
            },
            &ApiDefinition::new("login", "login")
                .with_content_type("application/json")
                .with_redirects(),
        );
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(content_type(&response), "text/plain");
        assert_eq!(response.headers()[header::LOCATION], "/dashboard");
        assert_eq!(
            body_text(response).await,
            "You are being redirected to /dashboard"
        );
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_500() {
        let response = render(
            InvocationOutcome::Success {
                payload: json!({"response": {}}),
            },
            &ApiDefinition::new("login", "login").with_redirects(),
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_handled_error_json_serializes_payload() {
        let body = json!({"httpStatus": 404, "response": "no such user"});
        let response = render(
            InvocationOutcome::HandledError {
                http_status: 404,
                body: body.clone(),
            },
            &ApiDefinition::new("get", "users/{id}").with_content_type("application/json"),
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let text = body_text(response).await;
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), body);
    }

    #[tokio::test]
    async fn test_handled_error_html_writes_response_field() {
        let response = render(
            InvocationOutcome::HandledError {
                http_status: 422,
                body: json!({"httpStatus": 422, "response": "bad input", "unhandled": true}),
            },
            &ApiDefinition::new("form", "form"),
        );
        assert_eq!(response.status().as_u16(), 422);
        assert_eq!(content_type(&response), "text/html");
        assert_eq!(body_text(response).await, "bad input");
    }

    #[tokio::test]
    async fn test_handled_error_plain_text_writes_response_field() {
        let response = render(
            InvocationOutcome::HandledError {
                http_status: 422,
                body: json!({"httpStatus": 422, "response": "bad input"}),
            },
            &ApiDefinition::new("validate", "validate").with_content_type("text/plain"),
        );
        assert_eq!(response.status().as_u16(), 422);
        assert_eq!(content_type(&response), "text/plain");
        assert_eq!(body_text(response).await, "bad input");
    }

    #[tokio::test]
    async fn test_invalid_status_becomes_500() {
        let response = render(
            InvocationOutcome::HandledError {
                http_status: 42,
                body: json!({"httpStatus": 42}),
            },
            &ApiDefinition::new("odd", "odd"),
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unhandled_is_generic_500() {
        let response = render(
            InvocationOutcome::unhandled("segfault"),
            &ApiDefinition::new("crash", "crash"),
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_error_bodies() {
        let denied = render_error(&GatewayError::unauthorized(ErrorCode::AuthorizationDenied));
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        assert_eq!(content_type(&denied), "application/json");
        assert_eq!(body_text(denied).await, r#"{"message":"Unauthorized"}"#);

        let missing = render_error(&GatewayError::route_not_found("/nope?x=1"));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(missing).await,
            "API not found at path '/nope?x=1'"
        );
    }
}

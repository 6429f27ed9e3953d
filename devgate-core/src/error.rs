//! Pipeline error taxonomy

use serde::Serialize;
use thiserror::Error;

/// Every failure kind the request pipeline can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Routing
    RouteNotFound,

    // Request decoding
    BodyParseFailure,

    // Authorizer gate
    AuthorizationMissing,
    AuthorizationDenied,

    // Collaborators
    StackDescriptionFailed,
    RoleNotFound,
    CredentialsUnavailable,
    UpstreamUnavailable,

    // Invocation
    HandledInvocationError,
    UnhandledInvocationError,
    EmptyResponsePayload,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RouteNotFound => "RouteNotFound",
            Self::BodyParseFailure => "BodyParseFailure",
            Self::AuthorizationMissing => "AuthorizationMissing",
            Self::AuthorizationDenied => "AuthorizationDenied",
            Self::StackDescriptionFailed => "StackDescriptionFailed",
            Self::RoleNotFound => "RoleNotFound",
            Self::CredentialsUnavailable => "CredentialsUnavailable",
            Self::UpstreamUnavailable => "UpstreamUnavailable",
            Self::HandledInvocationError => "HandledInvocationError",
            Self::UnhandledInvocationError => "UnhandledInvocationError",
            Self::EmptyResponsePayload => "EmptyResponsePayload",
        }
    }

    /// Status code sent to the client when this kind terminates a request.
    ///
    /// Handled invocation errors carry their own status, so the value here is
    /// only the fallback used when the payload status is unusable.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::RouteNotFound => 404,
            Self::AuthorizationMissing => 401,
            Self::AuthorizationDenied => 403,
            Self::UpstreamUnavailable => 502,
            Self::BodyParseFailure | Self::EmptyResponsePayload => 200,
            Self::StackDescriptionFailed
            | Self::RoleNotFound
            | Self::CredentialsUnavailable
            | Self::HandledInvocationError
            | Self::UnhandledInvocationError => 500,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline failure that terminates the current request
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct GatewayError {
    pub code: ErrorCode,
    pub message: String,
}

impl GatewayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn route_not_found(url: &str) -> Self {
        Self::new(
            ErrorCode::RouteNotFound,
            format!("API not found at path '{url}'"),
        )
    }

    pub fn unauthorized(code: ErrorCode) -> Self {
        Self::new(code, "Unauthorized")
    }

    pub fn status(&self) -> u16 {
        self.code.http_status()
    }

    /// Format as the gateway's JSON error body
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct JsonError<'a> {
            message: &'a str,
        }

        serde_json::to_string(&JsonError {
            message: &self.message,
        })
        .unwrap_or_else(|_| format!(r#"{{"message":"{}"}}"#, self.code.as_str()))
    }
}

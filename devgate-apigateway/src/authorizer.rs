//! Token authorizers and the gate in front of protected definitions

use async_trait::async_trait;
use axum::http::HeaderMap;
use devgate_core::{ErrorCode, GatewayError, StageContext};
use devgate_iam::CredentialBroker;
use devgate_lambda::{InvocationOutcome, SandboxedInvoker};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Method ARN presented to every authorizer; policies must grant it
pub const METHOD_ARN: &str = "arn:fake";

/// Header carrying the bearer token
pub const TOKEN_HEADER: &str = "token";

const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Event handed to an authorizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "authorizationToken")]
    pub authorization_token: String,
    #[serde(rename = "methodArn")]
    pub method_arn: String,
}

impl AuthorizationRequest {
    pub fn token(authorization_token: impl Into<String>) -> Self {
        Self {
            kind: "TOKEN".to_string(),
            authorization_token: authorization_token.into(),
            method_arn: METHOD_ARN.to_string(),
        }
    }
}

/// What an authorizer can see besides the request
#[derive(Debug, Clone, Default)]
pub struct AuthorizerContext {
    pub stage: StageContext,
}

impl AuthorizerContext {
    pub fn template_outputs(&self) -> &BTreeMap<String, String> {
        &self.stage.outputs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizerVerdict {
    Succeed {
        policy_document: Option<Value>,
        principal_id: Value,
    },
    Fail(String),
}

#[derive(Debug, Error)]
pub enum AuthorizerError {
    #[error("authorizer credentials unavailable: {0}")]
    Credentials(String),

    #[error("authorizer crashed: {0}")]
    Crashed(String),
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(
        &self,
        request: AuthorizationRequest,
        context: &AuthorizerContext,
    ) -> Result<AuthorizerVerdict, AuthorizerError>;
}

/// Run the gate for a protected definition.
///
/// Returns the principal id to attach to the event, or the 401/403 error
/// that ends the request.
pub async fn authorize_request(
    authorizer: &dyn Authorizer,
    headers: &HeaderMap,
    stage: &StageContext,
) -> Result<Value, GatewayError> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            warn!("Request is missing the token header");
            GatewayError::unauthorized(ErrorCode::AuthorizationMissing)
        })?;

    info!("Invoking authorizer");
    let context = AuthorizerContext {
        stage: stage.clone(),
    };
    let denied = || GatewayError::unauthorized(ErrorCode::AuthorizationDenied);

    match authorizer
        .authorize(AuthorizationRequest::token(token), &context)
        .await
    {
        Ok(AuthorizerVerdict::Succeed {
            policy_document,
            principal_id,
        }) => {
            let Some(policy) = policy_document else {
                warn!("Authorizer did not return a policy document");
                return Err(denied());
            };
            if !is_valid_policy(&policy) {
                warn!(policy = %policy, "Authorizer returned an invalid policy document");
                return Err(denied());
            }
            info!(principal_id = %principal_id, "Authorization succeeded");
            Ok(principal_id)
        }
        Ok(AuthorizerVerdict::Fail(message)) => {
            warn!(message = %message, "Authorizer denied the request");
            Err(denied())
        }
        Err(e) => {
            warn!(error = %e, "Authorizer failed");
            Err(denied())
        }
    }
}

/// A policy is valid when one statement allows invoking the method ARN
pub fn is_valid_policy(policy: &Value) -> bool {
    let Some(statements) = policy.get("Statement").and_then(Value::as_array) else {
        return false;
    };
    statements.iter().any(|statement| {
        statement.get("Effect").and_then(Value::as_str) == Some("Allow")
            && statement.get("Action").and_then(Value::as_str) == Some(INVOKE_ACTION)
            && statement.get("Resource").and_then(Value::as_str) == Some(METHOD_ARN)
    })
}

/// Runs the authorizer definition's handler in the sandbox under its own role
pub struct SandboxAuthorizer {
    handler_name: String,
    broker: Arc<dyn CredentialBroker>,
    invoker: Arc<SandboxedInvoker>,
}

impl SandboxAuthorizer {
    pub fn new(
        handler_name: impl Into<String>,
        broker: Arc<dyn CredentialBroker>,
        invoker: Arc<SandboxedInvoker>,
    ) -> Self {
        Self {
            handler_name: handler_name.into(),
            broker,
            invoker,
        }
    }
}

#[async_trait]
impl Authorizer for SandboxAuthorizer {
    async fn authorize(
        &self,
        request: AuthorizationRequest,
        context: &AuthorizerContext,
    ) -> Result<AuthorizerVerdict, AuthorizerError> {
        let credentials = self
            .broker
            .resolve_credentials(&context.stage, &self.handler_name)
            .await
            .map_err(|e| AuthorizerError::Credentials(e.to_string()))?;

        match self
            .invoker
            .invoke(&request, &self.handler_name, &credentials)
            .await
        {
            InvocationOutcome::Success { payload } => Ok(AuthorizerVerdict::Succeed {
                policy_document: payload.get("policyDocument").cloned(),
                principal_id: payload.get("principalId").cloned().unwrap_or(Value::Null),
            }),
            InvocationOutcome::HandledError { body, .. } => {
                let message = body
                    .get("response")
                    .and_then(Value::as_str)
                    .map_or_else(|| body.to_string(), str::to_string);
                Ok(AuthorizerVerdict::Fail(message))
            }
            InvocationOutcome::UnhandledError { reason } => Err(AuthorizerError::Crashed(reason)),
        }
    }
}

/// Authorizer backed by an async closure
pub struct FnAuthorizer<F> {
    authorize: F,
}

impl<F, Fut> FnAuthorizer<F>
where
    F: Fn(AuthorizationRequest, AuthorizerContext) -> Fut + Send + Sync,
    Fut: Future<Output = AuthorizerVerdict> + Send,
{
    pub fn new(authorize: F) -> Self {
        Self { authorize }
    }
}

#[async_trait]
impl<F, Fut> Authorizer for FnAuthorizer<F>
where
    F: Fn(AuthorizationRequest, AuthorizerContext) -> Fut + Send + Sync,
    Fut: Future<Output = AuthorizerVerdict> + Send,
{
    async fn authorize(
        &self,
        request: AuthorizationRequest,
        context: &AuthorizerContext,
    ) -> Result<AuthorizerVerdict, AuthorizerError> {
        Ok((self.authorize)(request, context.clone()).await)
    }
}

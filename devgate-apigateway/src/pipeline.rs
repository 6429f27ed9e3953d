//! The request pipeline for API traffic

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method},
    response::Response,
};
use devgate_core::{GatewayError, StageContext};
use devgate_iam::CredentialBroker;
use devgate_lambda::SandboxedInvoker;
use std::sync::Arc;
use tracing::{info, warn};

use crate::authorizer::authorize_request;
use crate::definition::ApiRegistry;
use crate::event::{empty_body, expects_body, parse_body, InvocationEvent};
use crate::matcher::match_route;
use crate::render::{render, render_error};

/// An API request after the dispatcher stripped any API prefix
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// The URL as the client sent it, used in error messages
    pub url: String,
    /// Path matched against route templates
    pub pathname: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Matches, authorizes, invokes and renders one API request
pub struct ApiPipeline {
    registry: Arc<ApiRegistry>,
    broker: Arc<dyn CredentialBroker>,
    invoker: Arc<SandboxedInvoker>,
}

impl ApiPipeline {
    pub fn new(
        registry: Arc<ApiRegistry>,
        broker: Arc<dyn CredentialBroker>,
        invoker: Arc<SandboxedInvoker>,
    ) -> Self {
        Self {
            registry,
            broker,
            invoker,
        }
    }

    pub fn registry(&self) -> &ApiRegistry {
        &self.registry
    }

    /// Run `request` against the stack snapshot `stage`.
    ///
    /// Always produces a response; pipeline failures render as their status.
    pub async fn handle(&self, request: ApiRequest, stage: &StageContext) -> Response {
        match self.process(request, stage).await {
            Ok(response) => response,
            Err(e) => {
                warn!(code = %e.code, status = e.status(), error = %e.message, "Request failed");
                render_error(&e)
            }
        }
    }

    async fn process(
        &self,
        request: ApiRequest,
        stage: &StageContext,
    ) -> Result<Response, GatewayError> {
        let ApiRequest {
            method,
            url,
            pathname,
            query,
            headers,
            body,
        } = request;

        let body = if expects_body(&method) {
            match to_bytes(body, usize::MAX).await {
                Ok(raw) => parse_body(&raw),
                Err(e) => {
                    warn!(error = %e, "Could not read request body, using an empty object");
                    empty_body()
                }
            }
        } else {
            empty_body()
        };

        let route = match_route(&self.registry, method.as_str(), &pathname)
            .ok_or_else(|| GatewayError::route_not_found(&url))?;
        let definition = Arc::clone(&route.definition);
        info!(route = %definition.name, method = %method, path = %pathname, "-> START");

        let mut event = InvocationEvent::build(&headers, query.as_deref(), &route, stage, body);

        if let Some(authorizer) = self.registry.authorizer_for(&definition) {
            let principal_id = authorize_request(authorizer.as_ref(), &headers, stage).await?;
            event = event.with_principal(principal_id);
        }

        let credentials = self
            .broker
            .resolve_credentials(stage, &definition.name)
            .await?;

        let outcome = self
            .invoker
            .invoke(&event, &definition.name, &credentials)
            .await;
        Ok(render(outcome, &definition))
    }
}

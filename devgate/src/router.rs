//! Request dispatcher

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use devgate_apigateway::{render_error, ApiPipeline, ApiRequest};
use devgate_cloudformation::StackDescriber;
use devgate_core::{GatewayError, RequestId};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info_span, Instrument};

use crate::assets::AssetsSource;
use crate::config::RootOrigin;

/// How request paths split between API and asset traffic
#[derive(Debug, Clone)]
pub struct Routing {
    pub root_origin: RootOrigin,
    pub api_prefix: String,
    pub assets_prefix: String,
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            root_origin: RootOrigin::Api,
            api_prefix: "/prod".to_string(),
            assets_prefix: "/assets".to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Traffic {
    /// Handled by the API pipeline; `pathname` is matched against templates
    Api { pathname: String },
    /// Handled by the assets source
    Assets { path: String },
}

impl Routing {
    pub fn classify(&self, path: &str) -> Traffic {
        match self.root_origin {
            RootOrigin::Assets => match strip_segment_prefix(path, &self.api_prefix) {
                Some(pathname) => Traffic::Api { pathname },
                None => Traffic::Assets {
                    path: path.to_string(),
                },
            },
            RootOrigin::Api => match strip_segment_prefix(path, &self.assets_prefix) {
                Some(path) => Traffic::Assets { path },
                None => Traffic::Api {
                    pathname: path.to_string(),
                },
            },
        }
    }
}

/// `path` without `prefix` when the prefix covers whole segments
fn strip_segment_prefix(path: &str, prefix: &str) -> Option<String> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Service state for the main router
pub struct AppState {
    pub pipeline: ApiPipeline,
    pub stack: Arc<dyn StackDescriber>,
    pub stack_name: String,
    pub routing: Routing,
    pub assets: AssetsSource,
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/favicon.ico", any(favicon))
        .route("/_devgate/health", get(health_check))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "stack": state.stack_name,
        "routes": state.pipeline.registry().route_count(),
    }))
}

async fn dispatch(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let request_id = RequestId::new();
    let span = info_span!("request", id = %request_id.short());
    handle(state, request).instrument(span).await
}

async fn handle(state: Arc<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    debug!(method = %parts.method, uri = %parts.uri, "->");

    match state.routing.classify(parts.uri.path()) {
        Traffic::Api { pathname } => {
            let stage = match state.stack.describe_stack(&state.stack_name).await {
                Ok(stage) => stage,
                Err(e) => {
                    error!(stack = %state.stack_name, error = %e, "Error describing stack");
                    return render_error(&GatewayError::from(e));
                }
            };

            let url = parts
                .uri
                .path_and_query()
                .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
            let request = ApiRequest {
                method: parts.method,
                url,
                pathname,
                query: parts.uri.query().map(str::to_string),
                headers: parts.headers,
                body,
            };
            state.pipeline.handle(request, &stage).await
        }
        Traffic::Assets { path } => {
            state
                .assets
                .serve(parts, body, &path, &state.routing.assets_prefix)
                .await
        }
    }
}

//! Non-API traffic: static files or a reverse proxy

use axum::{
    body::{to_bytes, Body},
    http::{header, request::Parts, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use devgate_core::ErrorCode;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{error, warn};
use url::Url;

/// Where asset requests are answered from
pub enum AssetsSource {
    Directory(PathBuf),
    Proxy(AssetsProxy),
}

impl AssetsSource {
    /// Answer an asset request; `path` is the request path with any assets
    /// prefix removed and without a query string. Misses name `prefix`.
    pub async fn serve(&self, parts: Parts, body: Body, path: &str, prefix: &str) -> Response {
        match self {
            Self::Directory(root) => serve_directory(root, &parts, path, prefix).await,
            Self::Proxy(proxy) => proxy.forward(parts, body).await,
        }
    }
}

async fn serve_directory(root: &Path, parts: &Parts, path: &str, prefix: &str) -> Response {
    let Ok(uri) = path.parse::<Uri>() else {
        return not_found(StatusCode::BAD_REQUEST, prefix, path);
    };

    let mut request = Request::new(Body::empty());
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = uri;
    *request.headers_mut() = parts.headers.clone();

    let response = match ServeDir::new(root).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    if response.status().is_client_error() || response.status().is_server_error() {
        return not_found(response.status(), prefix, path);
    }
    response.map(Body::new)
}

fn not_found(status: StatusCode, prefix: &str, path: &str) -> Response {
    let message = format!("Resource not found in '{prefix}' at path '{path}'");
    warn!("{}", message);
    (status, message).into_response()
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("could not read request body: {0}")]
    Body(#[from] axum::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("invalid upstream response: {0}")]
    Response(#[from] axum::http::Error),
}

/// Forwards requests to a running asset server
pub struct AssetsProxy {
    client: reqwest::Client,
    target: Url,
}

// Headers describing a single connection, never forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

impl AssetsProxy {
    pub fn new(target: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: reqwest::Client::new(),
            target: Url::parse(target)?,
        })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Relay the request upstream; failures answer 502
    pub async fn forward(&self, parts: Parts, body: Body) -> Response {
        match self.try_forward(parts, body).await {
            Ok(response) => response,
            Err(e) => {
                error!(code = %ErrorCode::UpstreamUnavailable, error = %e, "Proxy request error");
                (StatusCode::BAD_GATEWAY, format!("Proxy request error: {e}")).into_response()
            }
        }
    }

    async fn try_forward(&self, parts: Parts, body: Body) -> Result<Response, ProxyError> {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        let url = self
            .target
            .join(path_and_query)
            .map_err(|e| ProxyError::Invalid(e.to_string()))?;
        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| ProxyError::Invalid(e.to_string()))?;
        let body = to_bytes(body, usize::MAX).await?;

        let mut upstream = self.client.request(method, url);
        for (name, value) in &parts.headers {
            if name == header::HOST || is_hop_by_hop(name.as_str()) {
                continue;
            }
            upstream = upstream.header(name.as_str(), value.as_bytes());
        }
        let upstream = upstream.body(body).send().await?;

        let status = StatusCode::from_u16(upstream.status().as_u16())
            .map_err(|e| ProxyError::Invalid(e.to_string()))?;
        let mut response = Response::builder().status(status);
        for (name, value) in upstream.headers() {
            if is_hop_by_hop(name.as_str()) {
                continue;
            }
            response = response.header(name.as_str(), value.as_bytes());
        }
        let bytes = upstream.bytes().await?;
        Ok(response.body(Body::from(bytes))?)
    }
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(path: &str) -> Parts {
        Request::get(path).body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_directory_serves_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let source = AssetsSource::Directory(dir.path().to_path_buf());

        let response = source
            .serve(get("/assets/app.js"), Body::empty(), "/app.js", "/assets")
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "console.log(1)");
    }

    #[tokio::test]
    async fn test_directory_miss_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = AssetsSource::Directory(dir.path().to_path_buf());

        let response = source
            .serve(get("/assets/nope.css"), Body::empty(), "/nope.css", "/assets")
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            "Resource not found in '/assets' at path '/nope.css'"
        );
    }

    #[tokio::test]
    async fn test_directory_miss_names_configured_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let source = AssetsSource::Directory(dir.path().to_path_buf());

        let response = source
            .serve(get("/static/logo.png"), Body::empty(), "/logo.png", "/static")
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            "Resource not found in '/static' at path '/logo.png'"
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_502() {
        let port = portpicker::pick_unused_port().unwrap();
        let proxy = AssetsProxy::new(&format!("http://127.0.0.1:{port}")).unwrap();
        let source = AssetsSource::Proxy(proxy);

        let response = source
            .serve(get("/app.js"), Body::empty(), "/app.js", "/assets")
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_hop_by_hop() {
        assert!(is_hop_by_hop("connection"));
        assert!(is_hop_by_hop("transfer-encoding"));
        assert!(!is_hop_by_hop("content-type"));
    }
}

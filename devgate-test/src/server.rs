//! In-process test server

use devgate::{create_router, AppState};
use portpicker::pick_unused_port;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::STARTUP_TIMEOUT_SECS;

/// A devgate router served on a random local port
pub struct TestServer {
    task: JoinHandle<()>,
    base_url: String,
}

impl TestServer {
    /// Serve `state` on a random available port and wait until it answers
    pub async fn start(state: AppState) -> Result<Self, TestError> {
        let port = pick_unused_port().ok_or(TestError::NoPortAvailable)?;
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TestError::StartFailed(e.to_string()))?;

        info!(port = port, "Starting devgate test server");
        let app = create_router(state);
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Test server stopped");
            }
        });

        let base_url = format!("http://127.0.0.1:{port}");
        let health = format!("{base_url}/_devgate/health");
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_secs(STARTUP_TIMEOUT_SECS) {
            if let Ok(response) = reqwest::get(&health).await {
                if response.status().is_success() {
                    info!(port = port, "devgate ready");
                    return Ok(Self { task, base_url });
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        task.abort();
        Err(TestError::StartupTimeout)
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Get a client for calling the proxy
    pub fn client(&self) -> crate::DevgateClient {
        crate::DevgateClient::new(self.base_url.clone())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Errors that can occur with test server
#[derive(Debug)]
pub enum TestError {
    NoPortAvailable,
    StartFailed(String),
    StartupTimeout,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::NoPortAvailable => write!(f, "No available port found"),
            TestError::StartFailed(msg) => write!(f, "Failed to start server: {msg}"),
            TestError::StartupTimeout => write!(f, "Server startup timed out"),
        }
    }
}

impl std::error::Error for TestError {}

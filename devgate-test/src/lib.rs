//! Test utilities for devgate
//!
//! Provides utilities for integration testing the proxy:
//! - Build router state from fake collaborators ([`Fixture`])
//! - Serve it in-process on a random port ([`TestServer`])
//! - Client helpers for calling the proxy ([`DevgateClient`])
//!
//! ## Usage
//!
//! ```rust,no_run
//! use devgate_apigateway::ApiDefinition;
//! use devgate_lambda::{SandboxOutput, ScriptedSandbox};
//! use devgate_test::{Fixture, TestServer};
//!
//! #[tokio::test]
//! async fn test_home() {
//!     let sandbox = ScriptedSandbox::returning(SandboxOutput::success(r#"{"html":"hi"}"#));
//!     let state = Fixture::new()
//!         .api(ApiDefinition::new("home", ""))
//!         .sandbox(sandbox)
//!         .build()
//!         .unwrap();
//!     let server = TestServer::start(state).await.unwrap();
//!
//!     let response = server.client().get("/").await.unwrap();
//!     assert_eq!(response.text().await.unwrap(), "hi");
//! }
//! ```

pub mod client;
pub mod fixture;
pub mod server;

pub use client::{ClientError, DevgateClient};
pub use fixture::Fixture;
pub use server::{TestError, TestServer};

/// Timeout for waiting on the server to accept requests
pub const STARTUP_TIMEOUT_SECS: u64 = 10;

/// Install a test-friendly tracing subscriber; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devgate=debug,devgate_apigateway=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

//! Isolated execution environments

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tracing::debug;

/// Sandbox execution errors
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Sandbox not available: {0}")]
    NotAvailable(String),

    #[error("Failed to start sandbox: {0}")]
    StartFailed(String),

    #[error("Sandbox timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One handler execution
#[derive(Debug, Clone)]
pub struct SandboxRequest {
    /// Serialized invocation event
    pub event: String,
    /// Handler id, `<module>.<function>`
    pub handler: String,
    /// The complete environment the handler sees
    pub env: Vec<(String, String)>,
}

impl SandboxRequest {
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// What the sandbox process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxOutput {
    pub stdout: String,
    pub stderr: String,
    /// Whether the process exited successfully
    pub success: bool,
}

impl SandboxOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failure(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: false,
        }
    }
}

/// Executes a handler in isolation from the proxy process
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxOutput, SandboxError>;
}

/// Feed `input` to the child's stdin while collecting its output, all under
/// one `timeout`. The child is killed when the timeout fires, as long as it
/// was spawned with `kill_on_drop`.
pub(crate) async fn run_with_input(
    mut child: Child,
    input: &[u8],
    timeout: Duration,
) -> Result<SandboxOutput, SandboxError> {
    let stdin = child.stdin.take();
    let feed = async move {
        let Some(mut stdin) = stdin else {
            return;
        };
        // A handler may exit without reading its event; the exit status
        // and output still decide the outcome.
        if let Err(e) = stdin.write_all(input).await {
            debug!(error = %e, "Handler closed stdin early");
            return;
        }
        if let Err(e) = stdin.shutdown().await {
            debug!(error = %e, "Handler closed stdin early");
        }
    };

    let run = async move {
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        output
    };

    let output = tokio::time::timeout(timeout, run)
        .await
        .map_err(|_| SandboxError::Timeout(timeout))??;

    Ok(SandboxOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    })
}

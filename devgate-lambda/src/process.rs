//! Subprocess-based handler execution

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::function::SandboxConfig;
use crate::sandbox::{run_with_input, Sandbox, SandboxError, SandboxOutput, SandboxRequest};

/// Runs the configured command once per invocation.
///
/// The child starts from an empty environment: it sees the request's
/// variables and `PATH`, nothing else from the developer's shell. The event
/// is written to stdin and the handler id is appended to the arguments.
pub struct ProcessSandbox {
    config: SandboxConfig,
}

impl ProcessSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    fn command(&self, request: &SandboxRequest) -> Result<Command, SandboxError> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| SandboxError::StartFailed("no sandbox command configured".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .arg(&request.handler)
            .current_dir(&self.config.task_dir)
            .env_clear()
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env(
                "NODE_OPTIONS",
                format!("--max-old-space-size={}", self.config.memory_mb),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Ok(path) = std::env::var("PATH") {
            command.env("PATH", path);
        }

        Ok(command)
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxOutput, SandboxError> {
        debug!(command = ?self.config.command, handler = %request.handler, "Spawning handler process");

        let child = self
            .command(&request)?
            .spawn()
            .map_err(|e| SandboxError::StartFailed(e.to_string()))?;

        let timeout = self.config.timeout();
        let result = run_with_input(child, request.event.as_bytes(), timeout).await;
        if let Err(SandboxError::Timeout(_)) = &result {
            warn!(handler = %request.handler, "Handler process timeout");
        }
        result
    }
}

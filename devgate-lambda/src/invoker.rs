//! Sandboxed invoker

use devgate_core::Credentials;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::docker::DockerSandbox;
use crate::function::{ExecutorMode, SandboxConfig};
use crate::invocation::InvocationOutcome;
use crate::process::ProcessSandbox;
use crate::sandbox::{Sandbox, SandboxRequest};

/// Runs a definition's handler in the configured sandbox
pub struct SandboxedInvoker {
    sandbox: Arc<dyn Sandbox>,
    handler_module: String,
    node_env: String,
    region: Option<String>,
}

impl SandboxedInvoker {
    pub fn new(sandbox: Arc<dyn Sandbox>, config: &SandboxConfig) -> Self {
        Self {
            sandbox,
            handler_module: config.handler_module.clone(),
            node_env: config.node_env.clone(),
            region: config.region.clone(),
        }
    }

    /// Build the sandbox selected by `config.executor`
    pub async fn from_config(config: &SandboxConfig) -> Self {
        let sandbox: Arc<dyn Sandbox> = match config.executor {
            ExecutorMode::Docker => Arc::new(DockerSandbox::new(config.clone()).await),
            ExecutorMode::Subprocess => Arc::new(ProcessSandbox::new(config.clone())),
        };
        Self::new(sandbox, config)
    }

    /// Handler id for a definition, `<module>.<name>`
    pub fn handler_id(&self, handler_name: &str) -> String {
        format!("{}.{}", self.handler_module, handler_name)
    }

    /// The complete environment for one invocation
    fn environment(&self, credentials: &Credentials) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = credentials
            .env_vars()
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        env.push(("NODE_ENV".to_string(), self.node_env.clone()));
        if let Some(region) = &self.region {
            env.push(("AWS_REGION".to_string(), region.clone()));
            env.push(("AWS_DEFAULT_REGION".to_string(), region.clone()));
        }
        env
    }

    /// Execute `handler_name` with `event`.
    ///
    /// Never fails: sandbox faults become [`InvocationOutcome::UnhandledError`].
    pub async fn invoke<E: Serialize + ?Sized>(
        &self,
        event: &E,
        handler_name: &str,
        credentials: &Credentials,
    ) -> InvocationOutcome {
        let event = match serde_json::to_string(event) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Could not serialize invocation event");
                return InvocationOutcome::unhandled(e.to_string());
            }
        };

        let request = SandboxRequest {
            event,
            handler: self.handler_id(handler_name),
            env: self.environment(credentials),
        };

        match self.sandbox.execute(request).await {
            Ok(output) => {
                for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
                    info!(handler = %handler_name, "{}", line);
                }
                let outcome = InvocationOutcome::from_output(&output);
                if let InvocationOutcome::UnhandledError { reason } = &outcome {
                    error!(handler = %handler_name, reason = %reason, "Internal error while invoking handler");
                }
                outcome
            }
            Err(e) => {
                error!(handler = %handler_name, error = %e, "Internal error while invoking handler");
                InvocationOutcome::unhandled(e.to_string())
            }
        }
    }
}

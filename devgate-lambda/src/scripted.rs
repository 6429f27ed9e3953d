//! Sandbox returning prepared outputs

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::sandbox::{Sandbox, SandboxError, SandboxOutput, SandboxRequest};

type Script = dyn Fn(&SandboxRequest) -> Result<SandboxOutput, SandboxError> + Send + Sync;

/// Answers every execution from a closure and records the requests it saw
#[derive(Clone)]
pub struct ScriptedSandbox {
    script: Arc<Script>,
    requests: Arc<Mutex<Vec<SandboxRequest>>>,
}

impl ScriptedSandbox {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&SandboxRequest) -> Result<SandboxOutput, SandboxError> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always returns `output`
    pub fn returning(output: SandboxOutput) -> Self {
        Self::new(move |_| Ok(output.clone()))
    }

    /// Requests executed so far
    pub fn requests(&self) -> Vec<SandboxRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxOutput, SandboxError> {
        let output = (self.script)(&request);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        output
    }
}

//! Sandbox configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Supported function runtimes
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Runtime {
    #[serde(rename = "nodejs4.3")]
    Nodejs43,
    #[serde(rename = "nodejs6.10")]
    Nodejs610,
    #[serde(rename = "nodejs8.10")]
    #[default]
    Nodejs810,
    #[serde(rename = "nodejs10.x")]
    Nodejs10,
    #[serde(rename = "nodejs12.x")]
    Nodejs12,
}

impl Runtime {
    /// Get the Docker image emulating this runtime
    pub fn docker_image(&self) -> &'static str {
        match self {
            Self::Nodejs43 => "lambci/lambda:nodejs4.3",
            Self::Nodejs610 => "lambci/lambda:nodejs6.10",
            Self::Nodejs810 => "lambci/lambda:nodejs8.10",
            Self::Nodejs10 => "lambci/lambda:nodejs10.x",
            Self::Nodejs12 => "lambci/lambda:nodejs12.x",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nodejs43 => "nodejs4.3",
            Self::Nodejs610 => "nodejs6.10",
            Self::Nodejs810 => "nodejs8.10",
            Self::Nodejs10 => "nodejs10.x",
            Self::Nodejs12 => "nodejs12.x",
        }
    }
}

/// How handlers are executed
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// Run each invocation in a throwaway Docker container
    #[default]
    Docker,
    /// Run each invocation as a local child process
    Subprocess,
}

impl std::str::FromStr for ExecutorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docker" | "container" => Ok(Self::Docker),
            "subprocess" | "process" | "native" => Ok(Self::Subprocess),
            other => Err(format!("unknown executor '{other}'")),
        }
    }
}

/// Sandbox settings shared by every invocation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub executor: ExecutorMode,
    pub runtime: Runtime,
    /// Overrides the runtime's default image
    pub image: Option<String>,
    /// Directory holding the built handler bundle
    pub task_dir: PathBuf,
    /// Module exporting one function per definition
    pub handler_module: String,
    pub memory_mb: u32,
    pub timeout_secs: u64,
    /// Value of `NODE_ENV` inside the sandbox
    pub node_env: String,
    /// Region exported as `AWS_REGION`
    pub region: Option<String>,
    /// Program and arguments for the subprocess executor
    pub command: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorMode::Docker,
            runtime: Runtime::default(),
            image: None,
            task_dir: PathBuf::from(".devgate-dist"),
            handler_module: "daniloindex".to_string(),
            memory_mb: 512,
            timeout_secs: 30,
            node_env: std::env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string()),
            region: None,
            command: vec!["node".to_string(), "invoke.js".to_string()],
        }
    }
}

impl SandboxConfig {
    pub fn image(&self) -> &str {
        self.image
            .as_deref()
            .unwrap_or_else(|| self.runtime.docker_image())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

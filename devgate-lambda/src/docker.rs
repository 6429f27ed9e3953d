//! Docker-based handler execution
//!
//! Every invocation runs in a fresh container started from a Lambda runtime
//! image, with the task directory mounted read-only. Nothing is kept warm:
//! credentials are scoped to one invocation, and so is the container.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::function::SandboxConfig;
use crate::sandbox::{run_with_input, Sandbox, SandboxError, SandboxOutput, SandboxRequest};

/// Docker-based sandbox
pub struct DockerSandbox {
    config: SandboxConfig,
    task_dir: PathBuf,
    image_ready: OnceCell<()>,
    docker_available: bool,
}

impl DockerSandbox {
    /// Create a new Docker sandbox
    pub async fn new(config: SandboxConfig) -> Self {
        let docker_available = Self::check_docker().await;
        if !docker_available {
            warn!("Docker not available - invocations will fail");
        }

        // Bind mounts need an absolute path.
        let task_dir = match tokio::fs::canonicalize(&config.task_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!(task_dir = %config.task_dir.display(), error = %e, "Task directory not found");
                config.task_dir.clone()
            }
        };

        Self {
            config,
            task_dir,
            image_ready: OnceCell::new(),
            docker_available,
        }
    }

    /// Check if Docker is available
    async fn check_docker() -> bool {
        match Command::new("docker").arg("info").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    /// Ensure the Docker image is available (pull if needed)
    async fn ensure_image(&self) -> Result<(), SandboxError> {
        let image = self.config.image();

        let output = Command::new("docker")
            .args(["image", "inspect", image])
            .output()
            .await?;

        if output.status.success() {
            return Ok(());
        }

        info!(image = %image, "Pulling runtime image");

        let output = Command::new("docker").args(["pull", image]).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SandboxError::StartFailed(format!(
                "Failed to pull {image}: {stderr}"
            )));
        }

        Ok(())
    }

    /// Arguments for `docker`, without environment values.
    ///
    /// Variables are passed as bare `-e NAME` so docker copies the values
    /// from its own environment and they never show up in the process list.
    fn run_args(&self, container_name: &str, request: &SandboxRequest) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-i".to_string(),
            "--name".to_string(),
            container_name.to_string(),
            "--memory".to_string(),
            format!("{}m", self.config.memory_mb),
            "-v".to_string(),
            format!("{}:/var/task:ro", self.task_dir.display()),
            "-e".to_string(),
            "DOCKER_LAMBDA_USE_STDIN".to_string(),
        ];

        for (key, _) in &request.env {
            args.push("-e".to_string());
            args.push(key.clone());
        }

        args.push(self.config.image().to_string());
        args.push(request.handler.clone());
        args
    }

    async fn remove_container(container_name: &str) {
        let _ = Command::new("docker")
            .args(["rm", "-f", container_name])
            .output()
            .await;
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxOutput, SandboxError> {
        if !self.docker_available {
            return Err(SandboxError::NotAvailable(
                "Docker daemon is not running".to_string(),
            ));
        }

        self.image_ready
            .get_or_try_init(|| self.ensure_image())
            .await?;

        let container_name = format!(
            "devgate-lambda-{}",
            &uuid::Uuid::new_v4().simple().to_string()[..12]
        );
        let args = self.run_args(&container_name, &request);

        debug!(args = ?args, handler = %request.handler, "Starting container");

        let child = Command::new("docker")
            .args(&args)
            .env("DOCKER_LAMBDA_USE_STDIN", "1")
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::StartFailed(e.to_string()))?;

        let timeout = self.config.timeout();
        let result = run_with_input(child, request.event.as_bytes(), timeout).await;
        if let Err(SandboxError::Timeout(_)) = &result {
            warn!(
                container = %container_name,
                handler = %request.handler,
                "Container execution timeout"
            );
            // Killing the client does not stop the container.
            Self::remove_container(&container_name).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> DockerSandbox {
        DockerSandbox {
            config: SandboxConfig::default(),
            task_dir: PathBuf::from("/work/.devgate-dist"),
            image_ready: OnceCell::new(),
            docker_available: true,
        }
    }

    #[test]
    fn test_run_args_hide_env_values() {
        let request = SandboxRequest {
            event: "{}".to_string(),
            handler: "daniloindex.listUsers".to_string(),
            env: vec![
                ("AWS_ACCESS_KEY_ID".to_string(), "ASIA123".to_string()),
                ("AWS_SECRET_ACCESS_KEY".to_string(), "shh".to_string()),
            ],
        };

        let args = sandbox().run_args("devgate-lambda-test", &request);
        let joined = args.join(" ");

        assert!(joined.contains("--memory 512m"));
        assert!(joined.contains("-v /work/.devgate-dist:/var/task:ro"));
        assert!(joined.contains("-e AWS_SECRET_ACCESS_KEY"));
        assert!(!joined.contains("shh"));
        assert!(!joined.contains("ASIA123"));
        assert!(joined.ends_with("lambci/lambda:nodejs8.10 daniloindex.listUsers"));
    }

    #[tokio::test]
    async fn test_unavailable_docker_fails_fast() {
        let mut sandbox = sandbox();
        sandbox.docker_available = false;

        let request = SandboxRequest {
            event: "{}".to_string(),
            handler: "daniloindex.index".to_string(),
            env: Vec::new(),
        };

        let result = sandbox.execute(request).await;
        assert!(matches!(result, Err(SandboxError::NotAvailable(_))));
    }
}

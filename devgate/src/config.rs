//! Configuration management

use devgate_apigateway::ApiDefinition;
use devgate_cloudformation::template_stack_name;
use devgate_lambda::SandboxConfig;
use serde::Deserialize;
use std::path::Path;

/// Which origin the CDN serves at the root path
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RootOrigin {
    /// API at the root, assets below the assets prefix
    #[default]
    Api,
    /// Assets at the root, API below the API prefix
    Assets,
}

/// Main configuration structure
///
/// `/_devgate/health` and `/favicon.ico` are answered by the proxy itself,
/// so an `[[api]]` entry with either template is never reached.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app_name: String,

    /// Overrides the stack name derived from the app name and stage
    #[serde(default)]
    pub stack_name: Option<String>,

    #[serde(default)]
    pub root_origin: RootOrigin,

    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default = "default_assets_prefix")]
    pub assets_prefix: String,

    #[serde(default)]
    pub aws: AwsSettings,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// API definitions in registration order
    #[serde(default)]
    pub api: Vec<ApiDefinition>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AwsSettings {
    pub region: Option<String>,
    /// Custom endpoint for CloudFormation, IAM and STS
    pub endpoint_url: Option<String>,
}

fn default_api_prefix() -> String {
    "/prod".to_string()
}

fn default_assets_prefix() -> String {
    "/assets".to_string()
}

impl Config {
    /// Load configuration from `path` and `DEVGATE__*` environment variables.
    ///
    /// Nested keys use `__` as separator, e.g. `DEVGATE__AWS__REGION`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("DEVGATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config = config.try_deserialize::<Config>()?;
        if config.sandbox.region.is_none() {
            config.sandbox.region.clone_from(&config.aws.region);
        }
        Ok(config)
    }

    /// Name of the stack backing `stage`
    pub fn stack_name(&self, stage: &str) -> String {
        self.stack_name
            .clone()
            .unwrap_or_else(|| template_stack_name(&self.app_name, stage))
    }
}

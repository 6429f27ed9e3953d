//! Wiring the configured collaborators into the router state

use aws_config::{BehaviorVersion, Region, SdkConfig};
use devgate_apigateway::{ApiPipeline, ApiRegistry, Authorizer, SandboxAuthorizer};
use devgate_cloudformation::CloudFormationDescriber;
use devgate_iam::{AwsRoleDirectory, CredentialBroker, RoleCredentialBroker};
use devgate_lambda::SandboxedInvoker;
use std::sync::Arc;
use tracing::info;

use crate::assets::AssetsSource;
use crate::config::{AwsSettings, Config};
use crate::router::{AppState, Routing};

/// Shared AWS configuration with the configured region and endpoint applied
pub async fn aws_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}

/// Build the state for `stage` backed by AWS and the configured sandbox
pub async fn build_state(
    config: &Config,
    stage: &str,
    assets: AssetsSource,
) -> anyhow::Result<AppState> {
    let sdk_config = aws_sdk_config(&config.aws).await;

    let broker: Arc<dyn CredentialBroker> = Arc::new(RoleCredentialBroker::new(
        AwsRoleDirectory::new(&sdk_config),
    ));
    let invoker = Arc::new(SandboxedInvoker::from_config(&config.sandbox).await);

    let registry = ApiRegistry::new(config.api.clone(), |definition| -> Arc<dyn Authorizer> {
        Arc::new(SandboxAuthorizer::new(
            definition.name.clone(),
            Arc::clone(&broker),
            Arc::clone(&invoker),
        ))
    })?;
    info!(
        definitions = registry.len(),
        routes = registry.route_count(),
        "Registered API definitions"
    );

    Ok(AppState {
        pipeline: ApiPipeline::new(Arc::new(registry), broker, invoker),
        stack: Arc::new(CloudFormationDescriber::new(&sdk_config)),
        stack_name: config.stack_name(stage),
        routing: Routing {
            root_origin: config.root_origin,
            api_prefix: config.api_prefix.clone(),
            assets_prefix: config.assets_prefix.clone(),
        },
        assets,
    })
}

//! Router state assembled from fake collaborators

use devgate::{AppState, AssetsSource, Routing};
use devgate_apigateway::{
    ApiDefinition, ApiPipeline, ApiRegistry, Authorizer, AuthorizerVerdict, FnAuthorizer,
    RegistryError,
};
use devgate_cloudformation::{StackDescriber, StaticStack};
use devgate_core::{Credentials, StackResource, StageContext};
use devgate_iam::{CredentialBroker, StaticCredentialBroker};
use devgate_lambda::{SandboxConfig, SandboxOutput, SandboxedInvoker, ScriptedSandbox};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for an [`AppState`] that never touches AWS or Docker
pub struct Fixture {
    definitions: Vec<ApiDefinition>,
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
    outputs: BTreeMap<String, String>,
    resources: Vec<StackResource>,
    stack: Option<Arc<dyn StackDescriber>>,
    broker: Option<Arc<dyn CredentialBroker>>,
    sandbox: ScriptedSandbox,
    sandbox_config: SandboxConfig,
    routing: Routing,
    assets: Option<AssetsSource>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            authorizers: HashMap::new(),
            outputs: BTreeMap::new(),
            resources: Vec::new(),
            stack: None,
            broker: None,
            sandbox: ScriptedSandbox::returning(SandboxOutput::success("{}")),
            sandbox_config: SandboxConfig {
                node_env: "test".to_string(),
                ..SandboxConfig::default()
            },
            routing: Routing::default(),
            assets: None,
        }
    }

    pub fn api(mut self, definition: ApiDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Use `authorizer` for every definition naming `name` as its authorizer
    pub fn authorizer(mut self, name: &str, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizers.insert(name.to_string(), authorizer);
        self
    }

    pub fn output(mut self, key: &str, value: &str) -> Self {
        self.outputs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn resource(mut self, logical_id: &str, physical_id: &str) -> Self {
        self.resources
            .push(StackResource::new(logical_id, physical_id));
        self
    }

    /// Replace the stack describer built from `output`/`resource`
    pub fn stack(mut self, stack: Arc<dyn StackDescriber>) -> Self {
        self.stack = Some(stack);
        self
    }

    pub fn broker(mut self, broker: Arc<dyn CredentialBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn sandbox(mut self, sandbox: ScriptedSandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }

    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets = Some(AssetsSource::Directory(dir.into()));
        self
    }

    pub fn assets(mut self, assets: AssetsSource) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn build(self) -> Result<AppState, RegistryError> {
        let authorizers = self.authorizers;
        let registry = ApiRegistry::new(self.definitions, |definition| {
            authorizers
                .get(&definition.name)
                .cloned()
                .unwrap_or_else(deny_all)
        })?;

        let stack = self.stack.unwrap_or_else(|| -> Arc<dyn StackDescriber> {
            Arc::new(StaticStack::new(StageContext::new(
                self.outputs,
                self.resources,
            )))
        });
        let broker = self.broker.unwrap_or_else(|| -> Arc<dyn CredentialBroker> {
            Arc::new(StaticCredentialBroker::new(Credentials::new(
                "ASIATESTACCESSKEY",
                "test-secret",
                "test-session-token",
            )))
        });
        let invoker = Arc::new(SandboxedInvoker::new(
            Arc::new(self.sandbox),
            &self.sandbox_config,
        ));

        Ok(AppState {
            pipeline: ApiPipeline::new(Arc::new(registry), broker, invoker),
            stack,
            stack_name: "testDev".to_string(),
            routing: self.routing,
            assets: self
                .assets
                .unwrap_or_else(|| AssetsSource::Directory(std::env::temp_dir())),
        })
    }
}

/// Authorizer used when a definition names one the fixture was not given
fn deny_all() -> Arc<dyn Authorizer> {
    Arc::new(FnAuthorizer::new(|_, _| async {
        AuthorizerVerdict::Fail("no authorizer configured".to_string())
    }))
}

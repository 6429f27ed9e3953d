//! API definitions and the startup registry

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::authorizer::{Authorizer, AuthorizerVerdict, FnAuthorizer};

/// Content type used when a definition does not name one
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Path template of a definition.
///
/// `path = false` in configuration disables HTTP exposure, which is how
/// authorizer and event-handler definitions are declared.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRoutePath")]
pub enum RoutePath {
    Template(String),
    Disabled,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoutePath {
    Template(String),
    Flag(bool),
}

impl TryFrom<RawRoutePath> for RoutePath {
    type Error = String;

    fn try_from(raw: RawRoutePath) -> Result<Self, Self::Error> {
        match raw {
            RawRoutePath::Template(template) => Ok(Self::Template(template)),
            RawRoutePath::Flag(false) => Ok(Self::Disabled),
            RawRoutePath::Flag(true) => {
                Err("path must be a template string or false".to_string())
            }
        }
    }
}

/// One `[[api]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDefinition {
    pub name: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<RoutePath>,
    #[serde(default)]
    pub response_content_type: Option<String>,
    #[serde(default)]
    pub redirects: bool,
    /// Name of another definition whose handler authorizes this one
    #[serde(default)]
    pub authorizer: Option<String>,
    #[serde(default)]
    pub keep_warm: bool,
    #[serde(default)]
    pub no_wrap: bool,
    #[serde(default)]
    pub is_event_handler: bool,
}

impl ApiDefinition {
    /// A GET definition at `path`
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: None,
            path: Some(RoutePath::Template(path.into())),
            response_content_type: None,
            redirects: false,
            authorizer: None,
            keep_warm: false,
            no_wrap: false,
            is_event_handler: false,
        }
    }

    /// A definition with no HTTP exposure
    pub fn unrouted(name: impl Into<String>) -> Self {
        Self {
            path: Some(RoutePath::Disabled),
            ..Self::new(name, "")
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.response_content_type = Some(content_type.into());
        self
    }

    pub fn with_redirects(mut self) -> Self {
        self.redirects = true;
        self
    }

    pub fn with_authorizer(mut self, authorizer: impl Into<String>) -> Self {
        self.authorizer = Some(authorizer.into());
        self
    }

    /// Upper-cased method, GET when unset
    pub fn method(&self) -> String {
        self.method
            .as_deref()
            .map_or_else(|| "GET".to_string(), str::to_uppercase)
    }

    /// Route template, or `None` for definitions that are not routable
    pub fn template(&self) -> Option<&str> {
        match &self.path {
            Some(RoutePath::Template(template)) => Some(template),
            Some(RoutePath::Disabled) | None => None,
        }
    }

    pub fn content_type(&self) -> &str {
        self.response_content_type
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Content type the handler should produce, advertised in the event
    pub fn expected_response_content_type(&self) -> &str {
        if self.redirects {
            "text/plain"
        } else {
            self.content_type()
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("API definition at position {0} has an empty name")]
    EmptyName(usize),

    #[error("API '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("API '{api}' names unknown authorizer '{authorizer}'")]
    UnknownAuthorizer { api: String, authorizer: String },
}

/// Ordered, immutable set of definitions with their resolved authorizers
pub struct ApiRegistry {
    definitions: Vec<Arc<ApiDefinition>>,
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
}

impl ApiRegistry {
    /// Validate `definitions` and resolve every authorizer reference.
    ///
    /// `bind` is called once per distinct authorizer definition; routes that
    /// share an authorizer share the resulting capability.
    pub fn new<F>(definitions: Vec<ApiDefinition>, mut bind: F) -> Result<Self, RegistryError>
    where
        F: FnMut(&ApiDefinition) -> Arc<dyn Authorizer>,
    {
        let authorizers = {
            let mut by_name: HashMap<&str, &ApiDefinition> = HashMap::new();
            for (position, definition) in definitions.iter().enumerate() {
                if definition.name.is_empty() {
                    return Err(RegistryError::EmptyName(position));
                }
                if by_name.insert(&definition.name, definition).is_some() {
                    return Err(RegistryError::DuplicateName(definition.name.clone()));
                }
            }

            let mut bound: HashMap<&str, Arc<dyn Authorizer>> = HashMap::new();
            let mut authorizers = HashMap::new();
            for definition in &definitions {
                let Some(authorizer_name) = definition.authorizer.as_deref() else {
                    continue;
                };
                let authorizer_definition = by_name.get(authorizer_name).copied().ok_or_else(|| {
                    RegistryError::UnknownAuthorizer {
                        api: definition.name.clone(),
                        authorizer: authorizer_name.to_string(),
                    }
                })?;
                let capability = bound
                    .entry(authorizer_name)
                    .or_insert_with(|| bind(authorizer_definition))
                    .clone();
                authorizers.insert(definition.name.clone(), capability);
            }
            authorizers
        };

        Ok(Self {
            definitions: definitions.into_iter().map(Arc::new).collect(),
            authorizers,
        })
    }

    /// A registry whose definitions must not reference authorizers
    pub fn without_authorizers(definitions: Vec<ApiDefinition>) -> Result<Self, RegistryError> {
        if let Some(definition) = definitions.iter().find(|d| d.authorizer.is_some()) {
            return Err(RegistryError::UnknownAuthorizer {
                api: definition.name.clone(),
                authorizer: definition.authorizer.clone().unwrap_or_default(),
            });
        }
        Self::new(definitions, |_| -> Arc<dyn Authorizer> {
            Arc::new(FnAuthorizer::new(|_, _| async {
                AuthorizerVerdict::Fail("no authorizer bound".to_string())
            }))
        })
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<ApiDefinition>> {
        self.definitions.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ApiDefinition>> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// The authorizer gating `definition`, if any
    pub fn authorizer_for(&self, definition: &ApiDefinition) -> Option<&Arc<dyn Authorizer>> {
        self.authorizers.get(&definition.name)
    }

    /// Number of definitions reachable over HTTP
    pub fn route_count(&self) -> usize {
        self.definitions
            .iter()
            .filter(|d| d.template().is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl std::fmt::Debug for ApiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut authorized: Vec<&str> = self.authorizers.keys().map(String::as_str).collect();
        authorized.sort_unstable();
        f.debug_struct("ApiRegistry")
            .field("definitions", &self.definitions)
            .field("authorized", &authorized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[derive(Deserialize)]
    struct File {
        api: Vec<ApiDefinition>,
    }

    fn allow_all() -> Arc<dyn Authorizer> {
        Arc::new(FnAuthorizer::new(|_, _| async {
            AuthorizerVerdict::Succeed {
                policy_document: None,
                principal_id: Value::Null,
            }
        }))
    }

    #[test]
    fn test_definitions_from_toml() {
        let file: File = toml::from_str(
            r#"
            [[api]]
            name = "listUsers"
            path = "users"

            [[api]]
            name = "createUser"
            method = "post"
            path = "users"
            response_content_type = "application/json"
            authorizer = "checkToken"

            [[api]]
            name = "checkToken"
            path = false
            "#,
        )
        .unwrap();

        let [list, create, check] = &file.api[..] else {
            panic!("expected three definitions");
        };
        assert_eq!(list.method(), "GET");
        assert_eq!(list.template(), Some("users"));
        assert_eq!(list.content_type(), "text/html");
        assert_eq!(create.method(), "POST");
        assert_eq!(create.content_type(), "application/json");
        assert_eq!(create.authorizer.as_deref(), Some("checkToken"));
        assert_eq!(check.path, Some(RoutePath::Disabled));
        assert_eq!(check.template(), None);
    }

    #[test]
    fn test_path_true_is_rejected() {
        let result: Result<File, _> = toml::from_str(
            r#"
            [[api]]
            name = "broken"
            path = true
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_redirects_expect_plain_text() {
        let definition = ApiDefinition::new("login", "login")
            .with_content_type("application/json")
            .with_redirects();
        assert_eq!(definition.expected_response_content_type(), "text/plain");
        assert_eq!(definition.content_type(), "application/json");
    }

    #[test]
    fn test_registry_rejects_duplicates_and_empty_names() {
        let duplicate = ApiRegistry::without_authorizers(vec![
            ApiDefinition::new("a", "x"),
            ApiDefinition::new("a", "y"),
        ]);
        assert_eq!(
            duplicate.unwrap_err(),
            RegistryError::DuplicateName("a".to_string())
        );

        let empty = ApiRegistry::without_authorizers(vec![ApiDefinition::new("", "x")]);
        assert_eq!(empty.unwrap_err(), RegistryError::EmptyName(0));
    }

    #[test]
    fn test_unknown_authorizer_fails_construction() {
        let result = ApiRegistry::new(
            vec![ApiDefinition::new("secret", "secret").with_authorizer("nobody")],
            |_| allow_all(),
        );
        assert_eq!(
            result.unwrap_err(),
            RegistryError::UnknownAuthorizer {
                api: "secret".to_string(),
                authorizer: "nobody".to_string(),
            }
        );
    }

    #[test]
    fn test_shared_authorizer_bound_once() {
        let mut bound = Vec::new();
        let registry = ApiRegistry::new(
            vec![
                ApiDefinition::new("one", "one").with_authorizer("gate"),
                ApiDefinition::new("two", "two").with_authorizer("gate"),
                ApiDefinition::unrouted("gate"),
            ],
            |definition| {
                bound.push(definition.name.clone());
                allow_all()
            },
        )
        .unwrap();

        assert_eq!(bound, vec!["gate".to_string()]);
        let one = registry.get("one").unwrap();
        let two = registry.get("two").unwrap();
        assert!(Arc::ptr_eq(
            registry.authorizer_for(one).unwrap(),
            registry.authorizer_for(two).unwrap()
        ));
        assert!(registry.authorizer_for(registry.get("gate").unwrap()).is_none());
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.route_count(), 2);
    }
}

//! Route matching

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::definition::{ApiDefinition, ApiRegistry};

/// The definition selected for a request and its bound path parameters
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub definition: Arc<ApiDefinition>,
    pub path_parameters: BTreeMap<String, String>,
}

/// Find the first registered definition matching `method` and `pathname`.
///
/// Definitions without an HTTP path are never candidates.
pub fn match_route(registry: &ApiRegistry, method: &str, pathname: &str) -> Option<RouteMatch> {
    let method = method.to_uppercase();
    registry.definitions().find_map(|definition| {
        let template = definition.template()?;
        if definition.method() != method {
            return None;
        }
        let path_parameters = compare(template, pathname)?;
        Some(RouteMatch {
            definition: Arc::clone(definition),
            path_parameters,
        })
    })
}

/// Match `pathname` against `template`, binding parameter segments.
///
/// Parameters are written `{name}` or `:name` and bind one non-empty raw
/// segment.
pub fn compare(template: &str, pathname: &str) -> Option<BTreeMap<String, String>> {
    let template = format!("/{}", template.trim_start_matches('/'));
    let expected: Vec<&str> = template.split('/').collect();
    let actual: Vec<&str> = pathname.split('/').collect();
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = BTreeMap::new();
    for (pattern, segment) in expected.iter().zip(&actual) {
        match parameter_name(pattern) {
            Some(name) => {
                if segment.is_empty() {
                    return None;
                }
                params.insert(name.to_string(), (*segment).to_string());
            }
            None if pattern == segment => {}
            None => return None,
        }
    }
    Some(params)
}

fn parameter_name(segment: &str) -> Option<&str> {
    let name = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .or_else(|| segment.strip_prefix(':'))?;
    (!name.is_empty()).then_some(name)
}

//! Stage metadata describing a deployed stack

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single resource of the deployed stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResource {
    pub logical_id: String,
    pub physical_id: String,
}

impl StackResource {
    pub fn new(logical_id: impl Into<String>, physical_id: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            physical_id: physical_id.into(),
        }
    }
}

/// Snapshot of a stack's outputs and resources, fetched once per request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageContext {
    /// Stack outputs, exposed to handlers as stage variables
    pub outputs: BTreeMap<String, String>,
    /// Stack resources in the order the describer returned them
    pub resources: Vec<StackResource>,
}

impl StageContext {
    pub fn new(outputs: BTreeMap<String, String>, resources: Vec<StackResource>) -> Self {
        Self { outputs, resources }
    }

    /// Physical id of the last resource whose logical id matches
    pub fn physical_id(&self, logical_id: &str) -> Option<&str> {
        self.resources
            .iter()
            .rev()
            .find(|r| r.logical_id == logical_id)
            .map(|r| r.physical_id.as_str())
    }
}

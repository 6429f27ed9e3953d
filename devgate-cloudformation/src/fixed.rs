//! Fixed stack describer

use async_trait::async_trait;
use devgate_core::StageContext;

use crate::describer::{StackDescriber, StackError};

/// Returns the same stage snapshot for every request.
///
/// Used by tests and for running the proxy against a stack description kept
/// in the configuration file instead of a live account.
#[derive(Debug, Clone, Default)]
pub struct StaticStack {
    stage: Option<StageContext>,
}

impl StaticStack {
    pub fn new(stage: StageContext) -> Self {
        Self { stage: Some(stage) }
    }

    /// A describer for which every stack lookup fails
    pub fn missing() -> Self {
        Self { stage: None }
    }
}

#[async_trait]
impl StackDescriber for StaticStack {
    async fn describe_stack(&self, stack_name: &str) -> Result<StageContext, StackError> {
        self.stage
            .clone()
            .ok_or_else(|| StackError::NotFound(stack_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgate_core::StackResource;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_static_stack_returns_snapshot() {
        let mut outputs = BTreeMap::new();
        outputs.insert("BucketName".to_string(), "assets-bucket".to_string());
        let stage = StageContext::new(outputs, vec![StackResource::new("Role", "role-123")]);

        let describer = StaticStack::new(stage.clone());
        assert_eq!(describer.describe_stack("shopProd").await.unwrap(), stage);
    }

    #[tokio::test]
    async fn test_missing_stack() {
        let result = StaticStack::missing().describe_stack("shopProd").await;
        assert!(matches!(result, Err(StackError::NotFound(name)) if name == "shopProd"));
    }
}

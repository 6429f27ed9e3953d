//! Stack describer trait

use async_trait::async_trait;
use devgate_core::{ErrorCode, GatewayError, StageContext};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("Stack not found: {0}")]
    NotFound(String),

    #[error("Error describing stack {stack}: {message}")]
    Describe { stack: String, message: String },
}

impl From<StackError> for GatewayError {
    fn from(err: StackError) -> Self {
        GatewayError::new(ErrorCode::StackDescriptionFailed, err.to_string())
    }
}

/// Fetches the outputs and resources of a deployed stack
#[async_trait]
pub trait StackDescriber: Send + Sync {
    async fn describe_stack(&self, stack_name: &str) -> Result<StageContext, StackError>;
}

/// Name of the stack deployed for `app_name` at `stage`, e.g. `shopProd`
pub fn template_stack_name(app_name: &str, stage: &str) -> String {
    let mut chars = stage.chars();
    let stage = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{app_name}{stage}")
}

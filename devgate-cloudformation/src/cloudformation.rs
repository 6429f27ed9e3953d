//! CloudFormation-backed stack describer

use async_trait::async_trait;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::Client;
use devgate_core::{SdkField, StackResource, StageContext};
use std::collections::BTreeMap;
use tracing::debug;

use crate::describer::{StackDescriber, StackError};

/// Describes stacks through the CloudFormation API
pub struct CloudFormationDescriber {
    client: Client,
}

impl CloudFormationDescriber {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn outputs(&self, stack_name: &str) -> Result<BTreeMap<String, String>, StackError> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| describe_error(stack_name, &DisplayErrorContext(&e)))?;

        let stack = output
            .stacks()
            .first()
            .ok_or_else(|| StackError::NotFound(stack_name.to_string()))?;

        Ok(stack
            .outputs()
            .iter()
            .filter_map(|o| {
                let key = o.output_key()?;
                let value = o.output_value()?;
                Some((key.to_string(), value.to_string()))
            })
            .collect())
    }

    async fn resources(&self, stack_name: &str) -> Result<Vec<StackResource>, StackError> {
        let mut resources = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_stack_resources()
                .stack_name(stack_name)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| describe_error(stack_name, &DisplayErrorContext(&e)))?;

            for summary in page.stack_resource_summaries() {
                let (Some(logical), Some(physical)) = (
                    summary.logical_resource_id().field(),
                    summary.physical_resource_id().field(),
                ) else {
                    continue;
                };
                resources.push(StackResource::new(logical, physical));
            }

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(resources)
    }
}

#[async_trait]
impl StackDescriber for CloudFormationDescriber {
    async fn describe_stack(&self, stack_name: &str) -> Result<StageContext, StackError> {
        let (outputs, resources) =
            tokio::try_join!(self.outputs(stack_name), self.resources(stack_name))?;

        debug!(
            stack = %stack_name,
            outputs = outputs.len(),
            resources = resources.len(),
            "Described stack"
        );

        Ok(StageContext::new(outputs, resources))
    }
}

fn describe_error(stack_name: &str, err: &dyn std::fmt::Display) -> StackError {
    StackError::Describe {
        stack: stack_name.to_string(),
        message: err.to_string(),
    }
}

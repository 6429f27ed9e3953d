//! IAM and STS backed role directory

use async_trait::async_trait;
use devgate_core::{Credentials, SdkField};
use tracing::debug;

use crate::broker::{BrokerError, RoleDirectory};

/// Looks roles up with IAM GetRole and assumes them with STS AssumeRole
pub struct AwsRoleDirectory {
    iam: aws_sdk_iam::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsRoleDirectory {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            iam: aws_sdk_iam::Client::new(config),
            sts: aws_sdk_sts::Client::new(config),
        }
    }
}

#[async_trait]
impl RoleDirectory for AwsRoleDirectory {
    async fn get_role_arn(&self, role_name: &str) -> Result<String, BrokerError> {
        let output = self
            .iam
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| BrokerError::RoleLookup {
                role: role_name.to_string(),
                message: aws_sdk_iam::error::DisplayErrorContext(&e).to_string(),
            })?;

        let arn = output
            .role()
            .field()
            .and_then(|role| role.arn().field())
            .ok_or_else(|| BrokerError::RoleLookup {
                role: role_name.to_string(),
                message: "GetRole returned no role".to_string(),
            })?;

        debug!(role = %role_name, arn = %arn, "Resolved role");
        Ok(arn.to_string())
    }

    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<Credentials, BrokerError> {
        let assume_error = |message: String| BrokerError::AssumeRole {
            arn: role_arn.to_string(),
            message,
        };

        let output = self
            .sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| assume_error(aws_sdk_sts::error::DisplayErrorContext(&e).to_string()))?;

        let creds = output
            .credentials()
            .field()
            .ok_or_else(|| assume_error("AssumeRole returned no credentials".to_string()))?;

        let access_key_id = creds.access_key_id().field().unwrap_or_default();
        let secret_access_key = creds.secret_access_key().field().unwrap_or_default();
        let session_token = creds.session_token().field().unwrap_or_default();
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(assume_error("AssumeRole returned incomplete credentials".to_string()));
        }

        Ok(Credentials::new(access_key_id, secret_access_key, session_token))
    }
}

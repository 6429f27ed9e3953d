//! Credential broker

use async_trait::async_trait;
use devgate_core::{Credentials, ErrorCode, GatewayError, StageContext};
use thiserror::Error;
use tracing::debug;

use crate::role::{template_role_name, SESSION_NAME};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Cannot find an IAM Role for '{0}'")]
    RoleNotFound(String),

    #[error("Role lookup failed for {role}: {message}")]
    RoleLookup { role: String, message: String },

    #[error("AssumeRole failed for {arn}: {message}")]
    AssumeRole { arn: String, message: String },
}

impl From<BrokerError> for GatewayError {
    fn from(err: BrokerError) -> Self {
        let code = match err {
            BrokerError::RoleNotFound(_) => ErrorCode::RoleNotFound,
            BrokerError::RoleLookup { .. } | BrokerError::AssumeRole { .. } => {
                ErrorCode::CredentialsUnavailable
            }
        };
        GatewayError::new(code, err.to_string())
    }
}

/// Role resolution and assumption
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Full resource name of the role with this physical name
    async fn get_role_arn(&self, role_name: &str) -> Result<String, BrokerError>;

    /// Temporary credentials for the role
    async fn assume_role(&self, role_arn: &str, session_name: &str)
        -> Result<Credentials, BrokerError>;
}

/// Supplies the credentials a definition's handler runs with
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    async fn resolve_credentials(
        &self,
        stage: &StageContext,
        definition_name: &str,
    ) -> Result<Credentials, BrokerError>;
}

/// Resolves the definition's execution role from the stage resources, then
/// looks it up and assumes it through a [`RoleDirectory`]
pub struct RoleCredentialBroker<D> {
    directory: D,
}

impl<D: RoleDirectory> RoleCredentialBroker<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl<D: RoleDirectory> CredentialBroker for RoleCredentialBroker<D> {
    async fn resolve_credentials(
        &self,
        stage: &StageContext,
        definition_name: &str,
    ) -> Result<Credentials, BrokerError> {
        let logical_name = template_role_name(definition_name);
        let role_name = stage
            .physical_id(&logical_name)
            .ok_or_else(|| BrokerError::RoleNotFound(logical_name.clone()))?;

        let role_arn = self.directory.get_role_arn(role_name).await?;
        debug!(definition = %definition_name, role_arn = %role_arn, "Assuming execution role");

        self.directory.assume_role(&role_arn, SESSION_NAME).await
    }
}

/// Hands out the same credentials for every definition
#[derive(Debug, Clone)]
pub struct StaticCredentialBroker {
    credentials: Credentials,
}

impl StaticCredentialBroker {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialBroker for StaticCredentialBroker {
    async fn resolve_credentials(
        &self,
        _stage: &StageContext,
        _definition_name: &str,
    ) -> Result<Credentials, BrokerError> {
        Ok(self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgate_core::StackResource;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDirectory {
        calls: Mutex<Vec<String>>,
        fail_assume: bool,
    }

    #[async_trait]
    impl RoleDirectory for RecordingDirectory {
        async fn get_role_arn(&self, role_name: &str) -> Result<String, BrokerError> {
            self.calls.lock().unwrap().push(format!("get:{role_name}"));
            Ok(format!("arn:aws:iam::123456789012:role/{role_name}"))
        }

        async fn assume_role(
            &self,
            role_arn: &str,
            session_name: &str,
        ) -> Result<Credentials, BrokerError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("assume:{role_arn}:{session_name}"));
            if self.fail_assume {
                return Err(BrokerError::AssumeRole {
                    arn: role_arn.to_string(),
                    message: "AccessDenied".to_string(),
                });
            }
            Ok(Credentials::new("ASIA", "secret", "token"))
        }
    }

    fn stage() -> StageContext {
        StageContext::new(
            BTreeMap::new(),
            vec![StackResource::new(
                "ExecutionRoleForLambdaListUsers",
                "shopProd-ExecutionRoleForLambdaLis-1ABC",
            )],
        )
    }

    #[tokio::test]
    async fn test_resolves_and_assumes_role() {
        let broker = RoleCredentialBroker::new(RecordingDirectory::default());

        let creds = broker.resolve_credentials(&stage(), "listUsers").await.unwrap();
        assert_eq!(creds.access_key_id, "ASIA");

        let calls = broker.directory.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "get:shopProd-ExecutionRoleForLambdaLis-1ABC".to_string(),
                "assume:arn:aws:iam::123456789012:role/shopProd-ExecutionRoleForLambdaLis-1ABC:devgate-dev-proxy".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_role_not_found_skips_directory() {
        let broker = RoleCredentialBroker::new(RecordingDirectory::default());

        let result = broker.resolve_credentials(&stage(), "deleteUser").await;
        assert!(matches!(
            result,
            Err(BrokerError::RoleNotFound(ref name)) if name == "ExecutionRoleForLambdaDeleteUser"
        ));
        assert!(broker.directory.calls.lock().unwrap().is_empty());

        let gateway: GatewayError = result.unwrap_err().into();
        assert_eq!(gateway.code, ErrorCode::RoleNotFound);
    }

    #[tokio::test]
    async fn test_assume_failure_propagates() {
        let broker = RoleCredentialBroker::new(RecordingDirectory {
            fail_assume: true,
            ..Default::default()
        });

        let err = broker
            .resolve_credentials(&stage(), "listUsers")
            .await
            .unwrap_err();
        let gateway: GatewayError = err.into();
        assert_eq!(gateway.code, ErrorCode::CredentialsUnavailable);
    }

    #[tokio::test]
    async fn test_static_broker() {
        let broker = StaticCredentialBroker::new(Credentials::new("a", "b", "c"));
        let creds = broker
            .resolve_credentials(&StageContext::default(), "anything")
            .await
            .unwrap();
        assert_eq!(creds, Credentials::new("a", "b", "c"));
    }
}

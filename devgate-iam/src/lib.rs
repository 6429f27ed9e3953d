//! Execution-role credentials for devgate
//!
//! Every invocation runs with temporary credentials obtained by assuming the
//! execution role the deployed stack created for that function. Nothing is
//! cached: each request performs its own lookup and assumption.

mod aws;
mod broker;
mod role;

pub use aws::AwsRoleDirectory;
pub use broker::{
    BrokerError, CredentialBroker, RoleCredentialBroker, RoleDirectory, StaticCredentialBroker,
};
pub use role::{template_lambda_name, template_role_name, SESSION_NAME};

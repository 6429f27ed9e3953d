//! Core types for devgate
//!
//! This crate provides the error taxonomy and the per-request value types
//! shared by every stage of the request pipeline.

pub mod credentials;
pub mod error;
pub mod request_id;
pub mod sdk;
pub mod stage;

pub use credentials::Credentials;
pub use error::{ErrorCode, GatewayError};
pub use request_id::RequestId;
pub use sdk::SdkField;
pub use stage::{StackResource, StageContext};

//! Stack description for devgate
//!
//! The proxy reads stage variables and execution-role identifiers from the
//! deployed stack on every API request. This crate defines that collaborator
//! and provides a CloudFormation-backed implementation plus a fixed one for
//! tests and offline use.

mod cloudformation;
mod describer;
mod fixed;

pub use cloudformation::CloudFormationDescriber;
pub use describer::{template_stack_name, StackDescriber, StackError};
pub use fixed::StaticStack;

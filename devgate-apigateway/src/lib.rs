//! API Gateway emulation for devgate
//!
//! Turns an HTTP request into a function invocation the way the deployed
//! gateway would:
//!
//! ```text
//! ApiRequest
//!   -> match_route (registry order, first match wins)
//!   -> InvocationEvent::build
//!   -> authorize_request (only for definitions with an authorizer)
//!   -> CredentialBroker::resolve_credentials
//!   -> SandboxedInvoker::invoke
//!   -> render
//! ```

pub mod authorizer;
pub mod definition;
pub mod event;
pub mod matcher;
pub mod pipeline;
pub mod render;

pub use authorizer::{
    authorize_request, AuthorizationRequest, Authorizer, AuthorizerContext, AuthorizerError,
    AuthorizerVerdict, FnAuthorizer, SandboxAuthorizer, METHOD_ARN,
};
pub use definition::{ApiDefinition, ApiRegistry, RegistryError, RoutePath};
pub use event::InvocationEvent;
pub use matcher::{match_route, RouteMatch};
pub use pipeline::{ApiPipeline, ApiRequest};
pub use render::{render, render_error};

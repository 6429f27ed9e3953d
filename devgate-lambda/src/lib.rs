//! Sandboxed function invocation for devgate
//!
//! Runs handlers in isolation, either in throwaway Docker containers built
//! from Lambda runtime images or as scoped child processes, with temporary
//! credentials injected through the environment.

pub mod docker;
pub mod function;
pub mod invocation;
pub mod invoker;
pub mod process;
pub mod sandbox;
pub mod scripted;

pub use docker::DockerSandbox;
pub use function::{ExecutorMode, Runtime, SandboxConfig};
pub use invocation::InvocationOutcome;
pub use invoker::SandboxedInvoker;
pub use process::ProcessSandbox;
pub use sandbox::{Sandbox, SandboxError, SandboxOutput, SandboxRequest};
pub use scripted::ScriptedSandbox;

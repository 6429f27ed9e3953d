//! Invocation outcomes

use serde_json::Value;
use tracing::error;

use crate::sandbox::SandboxOutput;

/// Result of running a handler, as seen by the response renderer
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The handler returned normally
    Success { payload: Value },
    /// The handler failed with a structured error carrying an HTTP status
    HandledError { http_status: u16, body: Value },
    /// The sandbox failed without a usable error payload
    UnhandledError { reason: String },
}

impl InvocationOutcome {
    pub fn unhandled(reason: impl Into<String>) -> Self {
        Self::UnhandledError {
            reason: reason.into(),
        }
    }

    /// Interpret what a sandbox process left behind
    pub fn from_output(output: &SandboxOutput) -> Self {
        let stdout = output.stdout.trim();

        if output.success {
            if stdout.is_empty() {
                return Self::Success {
                    payload: Value::Null,
                };
            }
            return match parse_json_output(stdout) {
                Some(payload) => Self::Success { payload },
                None => Self::unhandled("handler output is not valid JSON"),
            };
        }

        if stdout.is_empty() {
            return Self::unhandled("sandbox exited without output");
        }

        match parse_json_output(stdout).and_then(handled_error) {
            Some((http_status, body)) => {
                error!(http_status, error = %body, "Lambda terminated with error");
                Self::HandledError { http_status, body }
            }
            None => Self::unhandled(format!("unstructured handler failure: {stdout}")),
        }
    }
}

/// The whole output as JSON, or failing that its last non-empty line.
///
/// Runtimes may print log lines before the result.
fn parse_json_output(stdout: &str) -> Option<Value> {
    serde_json::from_str(stdout).ok().or_else(|| {
        stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| serde_json::from_str(line).ok())
    })
}

/// Extracts `(httpStatus, payload)` from a runtime error report.
///
/// Runtimes wrap the handler's error in `{"errorMessage": "<json text>"}`;
/// a bare payload is accepted too.
fn handled_error(report: Value) -> Option<(u16, Value)> {
    let payload = match report.get("errorMessage").and_then(Value::as_str) {
        Some(message) => serde_json::from_str::<Value>(message).ok()?,
        None => report,
    };

    let status = payload.get("httpStatus")?.as_u64()?;
    let status = u16::try_from(status).ok()?;
    Some((status, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_payload() {
        let output = SandboxOutput::success(r#"{"html":"<h1>hi</h1>"}"#);
        assert_eq!(
            InvocationOutcome::from_output(&output),
            InvocationOutcome::Success {
                payload: json!({"html": "<h1>hi</h1>"})
            }
        );
    }

    #[test]
    fn test_success_after_log_lines() {
        let output = SandboxOutput::success("START RequestId: 1\n{\"response\":\"ok\"}\n");
        assert_eq!(
            InvocationOutcome::from_output(&output),
            InvocationOutcome::Success {
                payload: json!({"response": "ok"})
            }
        );
    }

    #[test]
    fn test_empty_success_is_null_payload() {
        let output = SandboxOutput::success("");
        assert_eq!(
            InvocationOutcome::from_output(&output),
            InvocationOutcome::Success {
                payload: Value::Null
            }
        );
    }

    #[test]
    fn test_wrapped_handled_error() {
        let output = SandboxOutput::failure(
            r#"{"errorMessage":"{\"httpStatus\":422,\"response\":\"bad input\"}"}"#,
        );
        assert_eq!(
            InvocationOutcome::from_output(&output),
            InvocationOutcome::HandledError {
                http_status: 422,
                body: json!({"httpStatus": 422, "response": "bad input"})
            }
        );
    }

    #[test]
    fn test_bare_handled_error() {
        let output = SandboxOutput::failure(
            r#"{"unhandled":true,"message":"Unhandled internal error","httpStatus":500}"#,
        );
        match InvocationOutcome::from_output(&output) {
            InvocationOutcome::HandledError { http_status, body } => {
                assert_eq!(http_status, 500);
                assert_eq!(body["unhandled"], json!(true));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_failure_without_output_is_unhandled() {
        let output = SandboxOutput::failure("");
        assert!(matches!(
            InvocationOutcome::from_output(&output),
            InvocationOutcome::UnhandledError { .. }
        ));
    }

    #[test]
    fn test_error_without_status_is_unhandled() {
        let output = SandboxOutput::failure(r#"{"errorMessage":"TypeError: x is undefined"}"#);
        assert!(matches!(
            InvocationOutcome::from_output(&output),
            InvocationOutcome::UnhandledError { .. }
        ));
    }
}

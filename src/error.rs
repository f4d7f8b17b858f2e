//! Error types used by the exitvisor runtime and actions.
//!
//! This module defines two main error types:
//!
//! - [`ActionError`]: errors raised by individual actions (including isolated panics).
//! - [`RuntimeError`]: the aggregate returned by [`Supervisor::run`](crate::Supervisor::run).
//!
//! Both provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error object kept verbatim inside [`ActionError::Other`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by a single action.
///
/// `Canceled` is the only variant that means "stopped because asked to"; it is
/// treated as a graceful exit and never reaches the aggregate error.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ActionError {
    /// Action failed with a plain message.
    #[error("{error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Action failed with an error object; the original error is preserved.
    #[error(transparent)]
    Other(BoxError),

    /// Action panicked; the panic was caught at the isolation boundary.
    #[error("action panic: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
        /// Panic location followed by the captured stack.
        trace: String,
    },

    /// Action observed cancellation and stopped gracefully.
    #[error("context cancelled")]
    Canceled,
}

impl ActionError {
    /// Creates a [`ActionError::Fail`] from any displayable message.
    pub fn fail(error: impl Into<String>) -> Self {
        ActionError::Fail {
            error: error.into(),
        }
    }

    /// Wraps an arbitrary error object without flattening it to a string.
    pub fn other(error: impl Into<BoxError>) -> Self {
        ActionError::Other(error.into())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use exitvisor::ActionError;
    ///
    /// assert_eq!(ActionError::fail("bind failed").as_label(), "action_failed");
    /// assert_eq!(ActionError::Canceled.as_label(), "action_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ActionError::Fail { .. } | ActionError::Other(_) => "action_failed",
            ActionError::Panicked { .. } => "action_panicked",
            ActionError::Canceled => "action_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ActionError::Fail { error } => format!("error: {error}"),
            ActionError::Other(error) => format!("error: {error}"),
            ActionError::Panicked { message, .. } => format!("panic: {message}"),
            ActionError::Canceled => "context cancelled".to_string(),
        }
    }

    /// Returns `true` when the error is a graceful stop rather than a failure.
    pub fn is_graceful(&self) -> bool {
        matches!(self, ActionError::Canceled)
    }
}

impl From<std::io::Error> for ActionError {
    fn from(error: std::io::Error) -> Self {
        ActionError::Other(Box::new(error))
    }
}

/// One recorded failure: which action, at which position, with which error.
#[derive(Debug)]
pub struct ActionFailure {
    /// Position of the action in the supervised sequence.
    pub index: usize,
    /// Action name.
    pub action: Arc<str>,
    /// The error exactly as the action (or the isolator) produced it.
    pub error: ActionError,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.action, self.error)
    }
}

/// # Errors produced by the exitvisor runtime.
///
/// Every non-graceful action outcome of one supervised run, in action index order.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// One or more supervised actions failed or panicked.
    #[error("{}", render_failures(.failures))]
    ActionsFailed {
        /// Failures ordered by action index.
        failures: Vec<ActionFailure>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use exitvisor::RuntimeError;
    ///
    /// let err = RuntimeError::ActionsFailed { failures: vec![] };
    /// assert_eq!(err.as_label(), "runtime_actions_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ActionsFailed { .. } => "runtime_actions_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::ActionsFailed { failures } => {
                let names: Vec<&str> = failures.iter().map(|f| &*f.action).collect();
                format!("{} action(s) failed: {names:?}", failures.len())
            }
        }
    }

    /// Recorded failures, ordered by action index.
    pub fn failures(&self) -> &[ActionFailure] {
        match self {
            RuntimeError::ActionsFailed { failures } => failures,
        }
    }

    /// Consumes the error and returns the recorded failures.
    pub fn into_failures(self) -> Vec<ActionFailure> {
        match self {
            RuntimeError::ActionsFailed { failures } => failures,
        }
    }
}

fn render_failures(failures: &[ActionFailure]) -> String {
    match failures {
        [] => "no actions failed".to_string(),
        [one] => format!("action '{}' failed: {}", one.action, one.error),
        many => {
            let mut out = format!("{} actions failed:", many.len());
            for failure in many {
                out.push_str(&format!("\n\t* {failure}"));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(index: usize, action: &str, error: ActionError) -> ActionFailure {
        ActionFailure {
            index,
            action: Arc::from(action),
            error,
        }
    }

    #[test]
    fn test_single_failure_reports_the_error() {
        let err = RuntimeError::ActionsFailed {
            failures: vec![failure(0, "http", ActionError::fail("bind failed"))],
        };
        assert_eq!(err.to_string(), "action 'http' failed: bind failed");
    }

    #[test]
    fn test_single_panic_keeps_trace_out_of_display() {
        let err = RuntimeError::ActionsFailed {
            failures: vec![failure(
                2,
                "cron",
                ActionError::Panicked {
                    message: "kaboom".into(),
                    trace: "panicked at src/cron.rs:7:9".into(),
                },
            )],
        };
        assert_eq!(err.to_string(), "action 'cron' failed: action panic: kaboom");
        let ActionError::Panicked { trace, .. } = &err.failures()[0].error else {
            panic!("expected a crash error");
        };
        assert!(trace.contains("src/cron.rs"));
    }

    #[test]
    fn test_multiple_failures_each_appear_once() {
        let err = RuntimeError::ActionsFailed {
            failures: vec![
                failure(0, "http", ActionError::fail("bind failed")),
                failure(2, "jobs", ActionError::fail("redis gone")),
                failure(3, "cron", ActionError::Panicked {
                    message: "index out of bounds".into(),
                    trace: "panicked at src/cron.rs:7:9".into(),
                }),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("3 actions failed:"));
        for needle in ["bind failed", "redis gone", "index out of bounds"] {
            assert_eq!(text.matches(needle).count(), 1, "{needle} in {text}");
        }
    }

    #[test]
    fn test_other_keeps_source_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = ActionError::from(io);
        assert_eq!(err.to_string(), "address in use");
        match err {
            ActionError::Other(inner) => {
                let io = inner
                    .downcast_ref::<std::io::Error>()
                    .expect("io error preserved");
                assert_eq!(io.kind(), std::io::ErrorKind::AddrInUse);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_labels_and_graceful() {
        let crash = ActionError::Panicked {
            message: "x".into(),
            trace: String::new(),
        };
        assert_eq!(crash.as_label(), "action_panicked");
        assert!(ActionError::Canceled.is_graceful());
        assert!(!ActionError::fail("x").is_graceful());
    }

    #[test]
    fn test_failures_accessors() {
        let err = RuntimeError::ActionsFailed {
            failures: vec![failure(1, "a", ActionError::fail("boom"))],
        };
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.as_message(), "1 action(s) failed: [\"a\"]");
        let failures = err.into_failures();
        assert_eq!(failures[0].index, 1);
    }
}

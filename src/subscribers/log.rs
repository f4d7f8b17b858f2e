//! # Logging subscriber backed by `tracing`.
//!
//! [`LogWriter`] turns runtime events into structured `tracing` records under the
//! `exitvisor` target. Install any `tracing` subscriber (for example
//! `tracing_subscriber::fmt()`) to see them.
//!
//! ## Levels
//! - `info`: shutdown received / triggered / completed, all stopped
//! - `debug`: action starting / stopped
//! - `warn`: action failed, shutdown timed out, termination source unavailable, subscriber overflow
//! - `error`: action panicked, shutdown panicked, subscriber panicked
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use exitvisor::{LogWriter, Supervisor, SupervisorConfig};
//! let supervisor = Supervisor::builder(SupervisorConfig::default())
//!     .with_subscribers(vec![Arc::new(LogWriter)])
//!     .build();
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Structured logging subscriber.
///
/// Enabled via the `logging` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let action = e.action.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let trace = e.trace.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ActionStarting => {
                debug!(target: "exitvisor", seq = e.seq, action, index = e.index, "action starting");
            }
            EventKind::ActionStopped => {
                debug!(target: "exitvisor", seq = e.seq, action, index = e.index, "action stopped");
            }
            EventKind::ActionFailed => {
                warn!(target: "exitvisor", seq = e.seq, action, index = e.index, error = reason, "action failed");
            }
            EventKind::ActionPanicked => {
                error!(target: "exitvisor", seq = e.seq, action, index = e.index, panic = reason, trace, "action panic");
            }
            EventKind::ShutdownRequested => {
                info!(target: "exitvisor", seq = e.seq, "shutdown received");
            }
            EventKind::TerminationUnavailable => {
                warn!(target: "exitvisor", seq = e.seq, error = reason, "termination signals unavailable");
            }
            EventKind::ShutdownTriggered => {
                info!(target: "exitvisor", seq = e.seq, cause = reason, "shutdown triggered");
            }
            EventKind::ShutdownCompleted => {
                info!(target: "exitvisor", seq = e.seq, "shutdown procedure completed");
            }
            EventKind::ShutdownPanicked => {
                error!(target: "exitvisor", seq = e.seq, panic = reason, trace, "shutdown panic");
            }
            EventKind::ShutdownTimedOut => {
                warn!(target: "exitvisor", seq = e.seq, timeout_ms = e.timeout_ms, "shutdown procedure timed out");
            }
            EventKind::AllStopped => {
                info!(target: "exitvisor", seq = e.seq, failures = reason, "all actions stopped");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "exitvisor", seq = e.seq, subscriber = action, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                error!(target: "exitvisor", seq = e.seq, subscriber = action, panic = reason, trace, "subscriber panic");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

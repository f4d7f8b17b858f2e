//! # Action abstraction.
//!
//! An [`Action`] is a one-shot, long-lived unit of work: it runs until it is done
//! or fails. It receives the run's [`CancellationToken`] and may observe it to stop
//! cooperatively once shutdown has been triggered; actions that ignore the token
//! must be stopped by a side effect of the shutdown procedure instead (for example
//! a closed listener).

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::ActionError;

/// Boxed future returned by [`Action::spawn`].
pub type BoxActionFuture = Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'static>>;

/// Owned handle to a supervised action.
pub type ActionRef = Box<dyn Action>;

/// # One-shot, cancelable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use exitvisor::{Action, ActionError, BoxActionFuture};
///
/// struct Ticker;
///
/// impl Action for Ticker {
///     fn name(&self) -> &str { "ticker" }
///
///     fn spawn(self: Box<Self>, ctx: CancellationToken) -> BoxActionFuture {
///         Box::pin(async move {
///             ctx.cancelled().await;
///             Err(ActionError::Canceled)
///         })
///     }
/// }
/// ```
pub trait Action: Send + 'static {
    /// Returns a stable, human-readable action name.
    fn name(&self) -> &str;

    /// Consumes the action and produces the future that runs it.
    ///
    /// Returning `Err(ActionError::Canceled)` after observing `ctx` counts as a
    /// graceful stop.
    fn spawn(self: Box<Self>, ctx: CancellationToken) -> BoxActionFuture;
}

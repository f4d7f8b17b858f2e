//! # Action abstractions.
//!
//! - [`Action`] - trait for one-shot, cancelable units of work
//! - [`ActionFn`] - closure-backed action (async or blocking)
//! - [`ActionRef`] - owned handle (`Box<dyn Action>`)
//! - [`ShutdownFn`] - the caller's one-shot shutdown procedure

mod action;
mod action_fn;
mod shutdown_fn;

pub use action::{Action, ActionRef, BoxActionFuture};
pub use action_fn::ActionFn;
pub use shutdown_fn::ShutdownFn;

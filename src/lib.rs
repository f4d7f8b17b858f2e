//! # exitvisor
//!
//! **Exitvisor** is a process-lifetime supervisor for Rust services.
//!
//! It runs several independent long-lived actions concurrently (an HTTP server,
//! a job processor, ...), detects the first one to finish or the first external
//! termination request, triggers one coordinated shutdown, isolates panics inside
//! each action, and aggregates every resulting error into one outcome.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐
//!     │  ActionRef   │   │  ActionRef   │   │  TerminationWatcher  │
//!     │ (http serve) │   │ (job worker) │   │  (SIGINT / SIGTERM)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────────┬───────────┘
//!            ▼                  ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor::run(shutdown, actions)                               │
//! │  - one tokio task per action, each behind catch_unwind            │
//! │  - Result Set (index → failure)                                   │
//! │  - ShutdownTrigger (one-shot: cancel token, run procedure)        │
//! │  - Bus ─► SubscriberSet ─► Subscribe (LogWriter, metrics, ...)    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! run(shutdown, actions)
//!   ├─► append TerminationWatcher
//!   ├─► spawn every action (publish ActionStarting)
//!   │       │
//!   │       ├─ Ok / Canceled ─► publish ActionStopped
//!   │       ├─ Err           ─► publish ActionFailed,   record failure
//!   │       └─ panic         ─► publish ActionPanicked, record failure
//!   │       │
//!   │       └─► trigger.fire(cause)   (first completion wins)
//!   │              ├─► token.cancel()
//!   │              └─► shutdown(cause)   (isolated, optional deadline)
//!   ├─► wait for every action
//!   └─► Ok(()) or RuntimeError::ActionsFailed { failures }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Supervision**   | Run actions, shut down once, wait for all.                   | [`Supervisor`], [`SupervisorBuilder`]     |
//! | **Actions**       | Closures (async or blocking) or custom types.                | [`Action`], [`ActionFn`], [`ActionRef`]   |
//! | **Shutdown**      | Caller teardown, informed of what caused it.                 | [`ShutdownFn`], [`ShutdownCause`]         |
//! | **Termination**   | OS signals by default, pluggable source.                     | [`Termination`], [`OsSignals`]            |
//! | **Errors**        | Per-action errors and the aggregate.                         | [`ActionError`], [`RuntimeError`]         |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics).               | [`Subscribe`], [`Event`], [`EventKind`]   |
//! | **Configuration** | Event bus capacity, shutdown deadline.                       | [`SupervisorConfig`]                      |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber writing events through `tracing`.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use exitvisor::{ActionError, ActionFn, ShutdownFn, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new(SupervisorConfig::default());
//!
//!     let res = sup
//!         .run(
//!             ShutdownFn::new(|cause| async move {
//!                 println!("shutting down: {cause}");
//!             }),
//!             vec![
//!                 ActionFn::boxed("server", |_ctx| async {
//!                     Err(ActionError::fail("bind failed"))
//!                 }),
//!                 ActionFn::boxed("worker", |ctx: CancellationToken| async move {
//!                     ctx.cancelled().await;
//!                     Err(ActionError::Canceled)
//!                 }),
//!             ],
//!         )
//!         .await;
//!
//!     let err = res.unwrap_err();
//!     assert_eq!(err.to_string(), "action 'server' failed: bind failed");
//!     Ok(())
//! }
//! ```
mod actions;
mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use actions::{Action, ActionFn, ActionRef, BoxActionFuture, ShutdownFn};
pub use crate::core::{
    OsSignals, ShutdownCause, Supervisor, SupervisorBuilder, SupervisorConfig, Termination,
};
pub use error::{ActionError, ActionFailure, BoxError, RuntimeError};
pub use events::{Event, EventKind};
pub use subscribers::Subscribe;

// Optional: a `tracing`-backed logging subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

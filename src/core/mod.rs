//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Supervisor`] with its builder and
//! configuration, the [`Termination`] source trait and [`ShutdownCause`].
//!
//! Internal modules:
//! - [`boundary`]: panic boundary (message and trace) shared by actions, shutdown and subscribers;
//! - [`runner`]: runs one action behind the boundary and publishes its events;
//! - [`trigger`]: one-shot shutdown gate (cancel, then tear down);
//! - [`watcher`]: built-in action bridging termination requests;
//! - [`shutdown`]: termination sources (OS signals);
//! - [`supervisor`]: spawns everything, waits, aggregates.

mod boundary;
mod builder;
mod config;
mod runner;
mod shutdown;
mod supervisor;
mod trigger;
mod watcher;

pub(crate) use boundary::{catch, isolate, resume};

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use shutdown::{OsSignals, Termination};
pub use supervisor::Supervisor;
pub use trigger::ShutdownCause;

//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish runtime events emitted by action tasks, the shutdown trigger,
//! the termination watcher and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `core::runner::run_isolated`, `ShutdownTrigger`,
//!   `TerminationWatcher`, `Supervisor`, `SubscriberSet` workers (overflow/panic).
//! - **Consumer**: the per-run listener inside `Supervisor::run`, which fans out
//!   to the `SubscriberSet`.

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};

//! # Event subscribers for the exitvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the per-run fan-out set and the
//! optional built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   action task ── publish(Event) ──► Bus ──► run listener ──► SubscriberSet::emit
//!                                                                   │
//!                                                        ┌──────────┼──────────┐
//!                                                        ▼          ▼          ▼
//!                                                    LogWriter   Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub(crate) use subscriber_set::SubscriberSet;

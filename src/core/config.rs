//! # Global runtime configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the supervisor runtime.
//!
//! ## Sentinel values
//! - `shutdown_timeout = 0s` → the shutdown procedure runs without a deadline
//! - `subscriber_flush_timeout = 0s` → subscribers are not waited for at the end of a run

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `shutdown_timeout`: Deadline for the shutdown procedure (`0s` = unbounded)
/// - `subscriber_flush_timeout`: How long a finished run waits for subscribers to
///   process buffered events (`0s` = no wait); always bounded
///
/// The deadline bounds only the shutdown procedure. The supervisor always waits
/// for every action to finish.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow listeners that lag behind more than `bus_capacity` messages skip
    /// older items. Minimum value is 1.
    pub bus_capacity: usize,

    /// Maximum time the shutdown procedure may run before it is abandoned.
    ///
    /// - `Duration::ZERO` = no deadline (a hanging procedure hangs the run)
    /// - `> 0` = procedure future is dropped after the deadline, `ShutdownTimedOut` published
    pub shutdown_timeout: Duration,

    /// Maximum time [`Supervisor::run`](crate::Supervisor::run) waits, after every
    /// action has stopped, for subscribers to drain their queues.
    ///
    /// Workers still busy at the deadline are aborted and their remaining events
    /// are dropped.
    pub subscriber_flush_timeout: Duration,
}

impl SupervisorConfig {
    /// Returns the shutdown procedure deadline as an `Option`.
    #[inline]
    pub fn shutdown_deadline(&self) -> Option<Duration> {
        if self.shutdown_timeout == Duration::ZERO {
            None
        } else {
            Some(self.shutdown_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `shutdown_timeout = 0s` (unbounded)
    /// - `subscriber_flush_timeout = 1s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            shutdown_timeout: Duration::ZERO,
            subscriber_flush_timeout: Duration::from_secs(1),
        }
    }
}

//! # Runtime events emitted by the supervisor, the isolator and the shutdown trigger.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Action events**: one action's lifecycle (starting, stopped, failed, panicked)
//! - **Shutdown events**: termination request, trigger, procedure outcome, final stop
//! - **Subscriber events**: problems delivering events to subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, action name
//! and index, and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use exitvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ActionFailed)
//!     .with_action("http")
//!     .with_index(0)
//!     .with_reason("bind failed");
//!
//! assert_eq!(ev.kind, EventKind::ActionFailed);
//! assert_eq!(ev.action.as_deref(), Some("http"));
//! assert_eq!(ev.reason.as_deref(), Some("bind failed"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `action`: subscriber name
    /// - `reason`: panic message
    /// - `trace`: panic location and stack
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `action`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Action lifecycle events ===
    /// Action was spawned.
    ///
    /// Sets: `action`, `index`
    ActionStarting,

    /// Action finished successfully **or** stopped gracefully after cancellation.
    ///
    /// Sets: `action`, `index`
    ActionStopped,

    /// Action returned an error.
    ///
    /// Sets: `action`, `index`, `reason` (error message)
    ActionFailed,

    /// Action panicked; the isolator converted the panic into an error.
    ///
    /// Sets: `action`, `index`, `reason` (panic message), `trace`
    ActionPanicked,

    // === Shutdown events ===
    /// External termination request observed (OS signal or custom source).
    ShutdownRequested,

    /// The termination source could not be registered; only internal
    /// cancellation will stop the termination watcher.
    ///
    /// Sets: `reason` (registration error)
    TerminationUnavailable,

    /// The one-shot shutdown gate fired: cancellation raised, procedure starting.
    ///
    /// Sets: `reason` (the shutdown cause)
    ShutdownTriggered,

    /// The shutdown procedure returned.
    ShutdownCompleted,

    /// The shutdown procedure panicked; the panic was swallowed.
    ///
    /// Sets: `reason` (panic message), `trace`
    ShutdownPanicked,

    /// The shutdown procedure exceeded its deadline and was abandoned.
    ///
    /// Sets: `timeout_ms`
    ShutdownTimedOut,

    /// Every action, including the termination watcher, has finished.
    ///
    /// Sets: `reason` (number of failures)
    AllStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the action (or subscriber), if applicable.
    pub action: Option<Arc<str>>,
    /// Position of the action in the supervised sequence.
    pub index: Option<usize>,
    /// Human-readable reason (errors, panic messages, shutdown cause).
    pub reason: Option<Arc<str>>,
    /// Deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Panic location and stack, set on panic events.
    pub trace: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            action: None,
            index: None,
            reason: None,
            timeout_ms: None,
            trace: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an action name.
    #[inline]
    pub fn with_action(mut self, action: impl Into<Arc<str>>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Attaches the action's position.
    #[inline]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Attaches a panic trace.
    #[inline]
    pub fn with_trace(mut self, trace: impl Into<Arc<str>>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_action(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_action(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

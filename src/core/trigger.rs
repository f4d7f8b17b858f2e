//! # One-shot shutdown trigger.
//!
//! [`ShutdownTrigger::fire`] may be called by every finishing action; only the
//! first call has effect.
//!
//! ## Effect sequence (first caller only)
//! ```text
//! fire(cause)
//!   ├─► CAS fired: false → true        (losers return immediately)
//!   ├─► publish ShutdownTriggered{ cause }
//!   ├─► token.cancel()                 (cooperative cancellation)
//!   └─► isolate(procedure(cause))      (resource teardown, optional deadline)
//!         ├─ returned  → ShutdownCompleted
//!         ├─ panicked  → ShutdownPanicked  (swallowed)
//!         └─ deadline  → ShutdownTimedOut  (procedure future dropped)
//! ```
//!
//! Cancellation and teardown are two separate steps: some actions only observe the
//! token, others only observe what the procedure tears down.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::actions::ShutdownFn;
use crate::core::isolate;
use crate::events::{Bus, Event, EventKind};

/// The completion event that won the shutdown gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The termination watcher observed an external termination request.
    TerminationRequested,
    /// An action finished successfully or stopped gracefully.
    ActionCompleted {
        /// Name of the action.
        action: Arc<str>,
    },
    /// An action returned an error or panicked.
    ActionFailed {
        /// Name of the action.
        action: Arc<str>,
    },
}

impl ShutdownCause {
    /// Returns `true` when shutdown started because an action failed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShutdownCause::ActionFailed { .. })
    }
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::TerminationRequested => f.write_str("termination requested"),
            ShutdownCause::ActionCompleted { action } => write!(f, "action '{action}' completed"),
            ShutdownCause::ActionFailed { action } => write!(f, "action '{action}' failed"),
        }
    }
}

/// Idempotent, at-most-once shutdown gate for one supervised run.
pub(crate) struct ShutdownTrigger {
    fired: AtomicBool,
    token: CancellationToken,
    procedure: Mutex<Option<ShutdownFn>>,
    deadline: Option<Duration>,
    bus: Bus,
}

impl ShutdownTrigger {
    pub(crate) fn new(
        procedure: ShutdownFn,
        token: CancellationToken,
        deadline: Option<Duration>,
        bus: Bus,
    ) -> Self {
        Self {
            fired: AtomicBool::new(false),
            token,
            procedure: Mutex::new(Some(procedure)),
            deadline,
            bus,
        }
    }

    /// Fires the shutdown once; later and concurrent calls return immediately.
    ///
    /// Never fails and never panics outward.
    pub(crate) async fn fire(&self, cause: ShutdownCause) {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.bus
            .publish(Event::new(EventKind::ShutdownTriggered).with_reason(cause.to_string()));
        self.token.cancel();

        let procedure = self
            .procedure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(procedure) = procedure else {
            return;
        };

        let teardown = isolate(async move { procedure.call(cause).await });
        let outcome = match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, teardown).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    self.bus
                        .publish(Event::new(EventKind::ShutdownTimedOut).with_timeout(limit));
                    return;
                }
            },
            None => teardown.await,
        };

        match outcome {
            Ok(()) => self.bus.publish(Event::new(EventKind::ShutdownCompleted)),
            Err(crash) => self.bus.publish(
                Event::new(EventKind::ShutdownPanicked)
                    .with_reason(crash.message)
                    .with_trace(crash.trace),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn trigger_with(
        procedure: ShutdownFn,
        deadline: Option<Duration>,
    ) -> (Arc<ShutdownTrigger>, CancellationToken, Bus) {
        let token = CancellationToken::new();
        let bus = Bus::new(64);
        let trigger = Arc::new(ShutdownTrigger::new(
            procedure,
            token.clone(),
            deadline,
            bus.clone(),
        ));
        (trigger, token, bus)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_procedure_runs_exactly_once_under_concurrent_fire() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (trigger, _token, _bus) = trigger_with(
            ShutdownFn::new(move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }),
            None,
        );

        let mut set = tokio::task::JoinSet::new();
        for i in 0..32 {
            let trigger = trigger.clone();
            set.spawn(async move {
                trigger
                    .fire(ShutdownCause::ActionCompleted {
                        action: Arc::from(format!("a{i}")),
                    })
                    .await;
            });
        }
        while set.join_next().await.is_some() {}
        trigger.fire(ShutdownCause::TerminationRequested).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_precedes_procedure() {
        let observed = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();
        let bus = Bus::new(8);
        let (seen, watched) = (observed.clone(), token.clone());
        let trigger = ShutdownTrigger::new(
            ShutdownFn::new(move |_| async move {
                seen.store(watched.is_cancelled(), Ordering::SeqCst);
            }),
            token.clone(),
            None,
            bus,
        );

        assert!(!token.is_cancelled());
        trigger.fire(ShutdownCause::TerminationRequested).await;
        assert!(token.is_cancelled());
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_procedure_receives_cause() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let (trigger, _token, _bus) = trigger_with(
            ShutdownFn::new(move |cause| async move {
                let _ = tx.send(cause);
            }),
            None,
        );
        let cause = ShutdownCause::ActionFailed {
            action: Arc::from("http"),
        };
        trigger.fire(cause.clone()).await;
        let got = rx.await.expect("cause delivered");
        assert_eq!(got, cause);
        assert!(got.is_fatal());
    }

    #[tokio::test]
    async fn test_procedure_panic_is_swallowed_and_reported() {
        let (trigger, token, bus) = trigger_with(
            ShutdownFn::new(|_| async {
                panic!("teardown exploded");
            }),
            None,
        );
        let mut rx = bus.subscribe();

        trigger.fire(ShutdownCause::TerminationRequested).await;
        assert!(token.is_cancelled());

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ShutdownTriggered);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ShutdownPanicked);
        assert_eq!(ev.reason.as_deref(), Some("teardown exploded"));
        assert!(ev.trace.as_deref().is_some_and(|t| t.contains("trigger.rs")));
    }

    #[tokio::test]
    async fn test_blocking_procedure_panic_is_swallowed() {
        let (trigger, _token, bus) =
            trigger_with(ShutdownFn::blocking(|_| panic!("sync teardown")), None);
        let mut rx = bus.subscribe();

        trigger.fire(ShutdownCause::TerminationRequested).await;
        let _triggered = rx.recv().await.unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ShutdownPanicked);
        assert_eq!(ev.reason.as_deref(), Some("sync teardown"));
        assert!(ev.trace.as_deref().is_some_and(|t| t.contains("trigger.rs")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_hanging_procedure() {
        let (trigger, _token, bus) = trigger_with(
            ShutdownFn::new(|_| std::future::pending::<()>()),
            Some(Duration::from_millis(200)),
        );
        let mut rx = bus.subscribe();

        trigger.fire(ShutdownCause::TerminationRequested).await;
        let _triggered = rx.recv().await.unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ShutdownTimedOut);
        assert_eq!(ev.timeout_ms, Some(200));
    }
}

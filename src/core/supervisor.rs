//! # Supervisor: runs actions concurrently, shuts down once, aggregates errors.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   ShutdownFn, Vec<ActionRef>  ──►  Supervisor::run()
//!
//! Preparation (per run):
//!   - Bus::new(cfg.bus_capacity), listener: Bus ─► SubscriberSet::emit(Event)
//!   - token = CancellationToken::new()                       (Cancellation Signal)
//!   - trigger = ShutdownTrigger(shutdown, token, cfg.shutdown_timeout)
//!   - actions.push(TerminationWatcher(termination source))
//!
//! Spawn (JoinSet, one task per action):
//!   action[i] ──► run_isolated(action, token, i)
//!                   ├─ Err(e) ─► results.record(i, e)
//!                   └─► trigger.fire(cause)        (every completion; first one wins)
//!
//! Completion:
//!   join all ─► publish AllStopped ─► flush subscribers (bounded) ─► aggregate results
//! ```
//!
//! ## Rules
//! - Every action, including the watcher, is awaited; there is no forced abort
//! - The shutdown procedure runs at most once per run
//! - Failures are reported in action index order
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use exitvisor::{ActionError, ActionFn, ShutdownFn, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new(SupervisorConfig::default());
//!
//!     let res = sup
//!         .run(
//!             ShutdownFn::noop(),
//!             vec![
//!                 ActionFn::boxed("short", |_ctx| async {
//!                     tokio::time::sleep(Duration::from_millis(10)).await;
//!                     Ok(())
//!                 }),
//!                 ActionFn::boxed("long", |ctx: CancellationToken| async move {
//!                     ctx.cancelled().await;
//!                     Err(ActionError::Canceled)
//!                 }),
//!             ],
//!         )
//!         .await;
//!
//!     assert!(res.is_ok());
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::{sync::broadcast, task::JoinHandle, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::actions::{ActionRef, ShutdownFn};
use crate::core::{
    builder::SupervisorBuilder,
    config::SupervisorConfig,
    runner::run_isolated,
    shutdown::{OsSignals, Termination},
    trigger::{ShutdownCause, ShutdownTrigger},
    watcher::TerminationWatcher,
};
use crate::error::{ActionError, ActionFailure, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Runs a fixed set of actions for the lifetime of the process.
///
/// A supervisor can be reused: every [`run`](Supervisor::run) gets a fresh
/// cancellation token, trigger, event bus and termination registration.
pub struct Supervisor {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    termination: Arc<dyn Termination>,
}

impl Supervisor {
    /// Creates a supervisor with no subscribers that watches OS signals.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self::builder(cfg).build()
    }

    /// Starts building a supervisor.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
        termination: Option<Arc<dyn Termination>>,
    ) -> Self {
        Self {
            cfg,
            subscribers,
            termination: termination.unwrap_or_else(|| Arc::new(OsSignals)),
        }
    }

    /// Returns the runtime configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Runs `actions` concurrently until all of them have finished.
    ///
    /// The first action to finish (or an external termination request) fires the
    /// shutdown: the cancellation token handed to every action is cancelled and
    /// `shutdown` runs once. The call returns after every action has returned.
    ///
    /// With no actions, the run lasts until a termination request arrives.
    ///
    /// # Errors
    /// [`RuntimeError::ActionsFailed`] with every failed or panicked action, in
    /// index order. Graceful stops (`Ok(())`, [`ActionError::Canceled`]) are not errors.
    pub async fn run(
        &self,
        shutdown: ShutdownFn,
        mut actions: Vec<ActionRef>,
    ) -> Result<(), RuntimeError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let (listener, listener_stop) = self.subscriber_listener(&bus);

        let token = CancellationToken::new();
        let trigger = Arc::new(ShutdownTrigger::new(
            shutdown,
            token.clone(),
            self.cfg.shutdown_deadline(),
            bus.clone(),
        ));

        let watcher_index = actions.len();
        actions.push(Box::new(TerminationWatcher::new(
            Arc::clone(&self.termination),
            bus.clone(),
        )));

        let results = Arc::new(ResultSet::default());
        let mut set = JoinSet::new();
        for (index, action) in actions.into_iter().enumerate() {
            let name: Arc<str> = Arc::from(action.name());
            let ctx = token.clone();
            let bus = bus.clone();
            let trigger = Arc::clone(&trigger);
            let results = Arc::clone(&results);

            set.spawn(async move {
                let res = run_isolated(action, ctx, index, &bus).await;
                let cause = match &res {
                    Ok(()) if index == watcher_index => ShutdownCause::TerminationRequested,
                    Ok(()) => ShutdownCause::ActionCompleted {
                        action: Arc::clone(&name),
                    },
                    Err(_) => ShutdownCause::ActionFailed {
                        action: Arc::clone(&name),
                    },
                };
                if let Err(error) = res {
                    results.record(index, name, error);
                }
                trigger.fire(cause).await;
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }

        let failures = results.drain();
        bus.publish(Event::new(EventKind::AllStopped).with_reason(failures.len().to_string()));
        listener_stop.cancel();
        let _ = listener.await;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::ActionsFailed { failures })
        }
    }

    /// Forwards bus events to a fresh subscriber set until `stop` is cancelled,
    /// then drains what is buffered and flushes the subscriber workers within
    /// `subscriber_flush_timeout`.
    ///
    /// `SubscriberPanicked`/`SubscriberOverflow` reports raised during the final
    /// flush are not delivered: the queues are already closed by then.
    fn subscriber_listener(&self, bus: &Bus) -> (JoinHandle<()>, CancellationToken) {
        let stop = CancellationToken::new();
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(&self.subscribers, bus.clone());
        let stopped = stop.clone();
        let flush = self.cfg.subscriber_flush_timeout;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stopped.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(ev),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            set.shutdown(flush).await;
        });
        (handle, stop)
    }
}

/// Failures of one run, keyed by action index.
#[derive(Default)]
struct ResultSet {
    failures: Mutex<BTreeMap<usize, ActionFailure>>,
}

impl ResultSet {
    fn record(&self, index: usize, action: Arc<str>, error: ActionError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                index,
                ActionFailure {
                    index,
                    action,
                    error,
                },
            );
    }

    fn drain(&self) -> Vec<ActionFailure> {
        let mut map = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *map).into_values().collect()
    }
}

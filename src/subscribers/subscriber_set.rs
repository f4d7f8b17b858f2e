//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`]: distributes events to multiple subscribers
//! concurrently without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Isolation**: slow/panicking subscriber doesn't affect others
//! - **Per-subscriber FIFO**: each subscriber sees events in order

use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::core::isolate;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
///
/// One set lives for one supervised run; [`SubscriberSet::shutdown`] flushes it.
pub(crate) struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Workers report panics and overflows back to `bus`.
    #[must_use]
    pub(crate) fn new(subs: &[Arc<dyn Subscribe>], bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let s = Arc::clone(sub);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    if let Err(crash) = isolate(s.on_event(ev.as_ref())).await {
                        bus_for_worker.publish(
                            Event::subscriber_panicked(s.name(), crash.message)
                                .with_trace(crash.trace),
                        );
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Emits an event to all subscribers.
    ///
    /// - Uses `try_send` (non-blocking)
    /// - On queue full/closed: drops the event for that subscriber, publishes `SubscriberOverflow`
    /// - `SubscriberOverflow` events are not re-published if they themselves overflow
    pub(crate) fn emit(&self, event: Event) {
        let is_overflow_evt = event.is_subscriber_overflow();
        let event = Arc::new(event);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Shuts down all subscriber workers within `deadline`.
    ///
    /// 1. Drops all channel senders (workers see channel closed)
    /// 2. Awaits the workers (queued events are still delivered) until `deadline`
    /// 3. Aborts the workers still running; their queued events are dropped
    ///
    /// Returns the number of aborted workers.
    pub(crate) async fn shutdown(self, deadline: Duration) -> usize {
        drop(self.channels);

        let mut workers = self.workers;
        let drained = tokio::time::timeout(deadline, async {
            for h in workers.iter_mut() {
                let _ = h.await;
            }
        })
        .await;
        if drained.is_ok() {
            return 0;
        }

        let mut aborted = 0;
        for h in &workers {
            if !h.is_finished() {
                h.abort();
                aborted += 1;
            }
        }
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, ev: &Event) {
            if ev.kind == EventKind::ActionFailed {
                panic!("subscriber exploded");
            }
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn test_fan_out_preserves_per_subscriber_order() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![rec.clone()];
        let set = SubscriberSet::new(&subs, bus);

        set.emit(Event::new(EventKind::ActionStarting));
        set.emit(Event::new(EventKind::ActionStopped));
        set.emit(Event::new(EventKind::AllStopped));
        set.shutdown(Duration::from_secs(5)).await;

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![
                EventKind::ActionStarting,
                EventKind::ActionStopped,
                EventKind::AllStopped
            ]
        );
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_isolated() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Panicky), rec.clone()];
        let set = SubscriberSet::new(&subs, bus);

        set.emit(Event::new(EventKind::ActionFailed));
        set.emit(Event::new(EventKind::AllStopped));
        set.shutdown(Duration::from_secs(5)).await;

        assert_eq!(rec.seen.lock().unwrap().len(), 2);
        let reported = rx.recv().await.expect("panic report");
        assert_eq!(reported.kind, EventKind::SubscriberPanicked);
        assert_eq!(reported.action.as_deref(), Some("panicky"));
        assert_eq!(reported.reason.as_deref(), Some("subscriber exploded"));
    }

    #[tokio::test]
    async fn test_overflow_is_reported() {
        struct Stuck;

        #[async_trait]
        impl Subscribe for Stuck {
            async fn on_event(&self, _ev: &Event) {
                std::future::pending::<()>().await;
            }
            fn name(&self) -> &'static str {
                "stuck"
            }
            fn queue_capacity(&self) -> usize {
                1
            }
        }

        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Stuck)];
        let set = SubscriberSet::new(&subs, bus);

        for _ in 0..4 {
            set.emit(Event::new(EventKind::ActionStarting));
        }
        let reported = rx.recv().await.expect("overflow report");
        assert_eq!(reported.kind, EventKind::SubscriberOverflow);
        assert_eq!(reported.action.as_deref(), Some("stuck"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_stuck_worker_at_deadline() {
        struct Stuck;

        #[async_trait]
        impl Subscribe for Stuck {
            async fn on_event(&self, _ev: &Event) {
                std::future::pending::<()>().await;
            }
            fn name(&self) -> &'static str {
                "stuck"
            }
        }

        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Stuck), rec.clone()];
        let set = SubscriberSet::new(&subs, Bus::new(16));

        set.emit(Event::new(EventKind::AllStopped));
        let aborted = set.shutdown(Duration::from_millis(250)).await;

        assert_eq!(aborted, 1);
        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::AllStopped]);
    }
}

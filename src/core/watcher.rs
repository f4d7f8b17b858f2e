//! # Termination watcher.
//!
//! Built-in action appended to every supervised run. It bridges external
//! termination requests into the shutdown trigger: when it finishes on its own,
//! the supervisor fires the trigger with [`ShutdownCause::TerminationRequested`].
//!
//! ```text
//! select {
//!   source.requested() ─ Ok  ─► publish ShutdownRequested ─► Ok(())
//!                      └ Err ─► publish TerminationUnavailable ─► wait token ─► Ok(())
//!   token.cancelled()  ───────────────────────────────────────────────────► Ok(())
//! }
//! ```
//!
//! The watcher never returns an error: its presence is informational.
//!
//! [`ShutdownCause::TerminationRequested`]: crate::ShutdownCause::TerminationRequested

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::actions::{Action, BoxActionFuture};
use crate::core::shutdown::Termination;
use crate::events::{Bus, Event, EventKind};

pub(crate) const WATCHER_NAME: &str = "termination-watcher";

/// Action that waits for an external termination request or internal cancellation.
pub(crate) struct TerminationWatcher {
    source: Arc<dyn Termination>,
    bus: Bus,
}

impl TerminationWatcher {
    pub(crate) fn new(source: Arc<dyn Termination>, bus: Bus) -> Self {
        Self { source, bus }
    }
}

impl Action for TerminationWatcher {
    fn name(&self) -> &str {
        WATCHER_NAME
    }

    fn spawn(self: Box<Self>, ctx: CancellationToken) -> BoxActionFuture {
        Box::pin(async move {
            tokio::select! {
                _ = ctx.cancelled() => {}
                res = self.source.requested() => match res {
                    Ok(()) => self.bus.publish(Event::new(EventKind::ShutdownRequested)),
                    Err(e) => {
                        self.bus.publish(
                            Event::new(EventKind::TerminationUnavailable).with_reason(e.to_string()),
                        );
                        ctx.cancelled().await;
                    }
                },
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct Manual(Arc<Notify>);

    #[async_trait]
    impl Termination for Manual {
        async fn requested(&self) -> std::io::Result<()> {
            self.0.notified().await;
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Termination for Broken {
        async fn requested(&self) -> std::io::Result<()> {
            Err(std::io::Error::other("no signal driver"))
        }
    }

    #[tokio::test]
    async fn test_termination_request_completes_successfully() {
        let notify = Arc::new(Notify::new());
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let watcher = Box::new(TerminationWatcher::new(Arc::new(Manual(notify.clone())), bus));

        let handle = tokio::spawn(watcher.spawn(CancellationToken::new()));
        notify.notify_one();

        assert!(handle.await.unwrap().is_ok());
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ShutdownRequested);
    }

    #[tokio::test]
    async fn test_cancellation_completes_silently() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        let watcher = Box::new(TerminationWatcher::new(
            Arc::new(Manual(Arc::new(Notify::new()))),
            bus,
        ));

        let handle = tokio::spawn(watcher.spawn(token.clone()));
        token.cancel();

        assert!(handle.await.unwrap().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unavailable_source_waits_for_cancellation() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        let watcher = Box::new(TerminationWatcher::new(Arc::new(Broken), bus));

        let handle = tokio::spawn(watcher.spawn(token.clone()));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TerminationUnavailable);
        assert_eq!(ev.reason.as_deref(), Some("no signal driver"));
        assert!(!handle.is_finished());

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
    }
}

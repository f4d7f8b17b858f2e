//! # Run a single action behind the isolation boundary.
//!
//! Executes one [`Action`] to completion, converts panics into errors and
//! publishes lifecycle events to [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   action.spawn() → Ok(())                 → publish ActionStopped   → Ok(())
//!
//! Cancellation:
//!   action.spawn() → Err(Canceled)          → publish ActionStopped   → Ok(())
//!
//! Failure:
//!   action.spawn() → Err(Fail/Other)        → publish ActionFailed    → Err(e)
//!
//! Panic:
//!   action.spawn() ─ panic ─► catch_unwind  → publish ActionPanicked  → Err(Panicked{message, trace})
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event
//! - `Canceled` is a graceful exit and is folded into `Ok(())`
//! - Calling the action's closure happens **inside** the boundary, so a panic
//!   while building the future is caught as well

use tokio_util::sync::CancellationToken;

use crate::{
    actions::ActionRef,
    core::isolate,
    error::ActionError,
    events::{Bus, Event, EventKind},
};

/// Runs `action` to completion; never unwinds.
pub(crate) async fn run_isolated(
    action: ActionRef,
    ctx: CancellationToken,
    index: usize,
    bus: &Bus,
) -> Result<(), ActionError> {
    let name = action.name().to_owned();
    bus.publish(
        Event::new(EventKind::ActionStarting)
            .with_action(name.as_str())
            .with_index(index),
    );

    let res = match isolate(async move { action.spawn(ctx).await }).await {
        Ok(res) => res,
        Err(crash) => {
            bus.publish(
                Event::new(EventKind::ActionPanicked)
                    .with_action(name.as_str())
                    .with_index(index)
                    .with_reason(crash.message.as_str())
                    .with_trace(crash.trace.as_str()),
            );
            return Err(ActionError::Panicked {
                message: crash.message,
                trace: crash.trace,
            });
        }
    };

    match res {
        Ok(()) | Err(ActionError::Canceled) => {
            bus.publish(
                Event::new(EventKind::ActionStopped)
                    .with_action(name.as_str())
                    .with_index(index),
            );
            Ok(())
        }
        Err(e) => {
            bus.publish(
                Event::new(EventKind::ActionFailed)
                    .with_action(name.as_str())
                    .with_index(index)
                    .with_reason(e.to_string()),
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionFn;

    fn kinds(mut rx: tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    #[tokio::test]
    async fn test_success_publishes_stopped() {
        let bus = Bus::new(8);
        let rx = bus.subscribe();
        let action = ActionFn::boxed("ok", |_ctx| async { Ok(()) });

        assert!(run_isolated(action, CancellationToken::new(), 0, &bus).await.is_ok());
        assert_eq!(
            kinds(rx),
            vec![EventKind::ActionStarting, EventKind::ActionStopped]
        );
    }

    #[tokio::test]
    async fn test_canceled_is_graceful() {
        let bus = Bus::new(8);
        let rx = bus.subscribe();
        let token = CancellationToken::new();
        token.cancel();
        let action = ActionFn::boxed("polite", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(ActionError::Canceled)
        });

        assert!(run_isolated(action, token, 1, &bus).await.is_ok());
        assert_eq!(
            kinds(rx),
            vec![EventKind::ActionStarting, EventKind::ActionStopped]
        );
    }

    #[tokio::test]
    async fn test_failure_is_returned_verbatim() {
        let bus = Bus::new(8);
        let rx = bus.subscribe();
        let action = ActionFn::boxed("http", |_ctx| async {
            Err(ActionError::fail("bind failed"))
        });

        let err = run_isolated(action, CancellationToken::new(), 2, &bus)
            .await
            .unwrap_err();
        assert!(matches!(&err, ActionError::Fail { error } if error == "bind failed"));
        assert_eq!(
            kinds(rx),
            vec![EventKind::ActionStarting, EventKind::ActionFailed]
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let action = ActionFn::boxed("crashy", |_ctx| async {
            let v: Vec<u8> = Vec::new();
            let _byte = v[3];
            Ok(())
        });

        let err = run_isolated(action, CancellationToken::new(), 3, &bus)
            .await
            .unwrap_err();
        let ActionError::Panicked { message, trace } = &err else {
            panic!("expected panic error, got {err:?}");
        };
        assert!(message.contains("index out of bounds"), "{message}");
        assert!(trace.contains("runner.rs"), "{trace}");

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ActionStarting);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ActionPanicked);
        assert_eq!(ev.index, Some(3));
        assert_eq!(ev.action.as_deref(), Some("crashy"));
        assert!(ev.trace.as_deref().is_some_and(|t| t.starts_with("panicked at ")));
    }

    fn resources_ready() -> bool {
        false
    }

    #[tokio::test]
    async fn test_panic_while_building_future_is_caught() {
        let bus = Bus::new(8);
        let action = ActionFn::boxed("eager", |_ctx: CancellationToken| {
            if !resources_ready() {
                panic!("before the future");
            }
            async { Ok(()) }
        });

        let err = run_isolated(action, CancellationToken::new(), 0, &bus)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "action panic: before the future");
    }
}

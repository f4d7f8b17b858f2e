//! # Panic isolation boundary.
//!
//! [`isolate`] drives a future under `catch_unwind` and turns a panic into a
//! [`Crash`]: the payload message plus a diagnostic trace. It is the single fault
//! boundary used around actions, the shutdown procedure and subscriber workers.
//! [`catch`] is the synchronous twin for closures on the blocking pool; its
//! crash travels back to the awaiting task through [`resume`].
//!
//! ## Traces
//! The first use installs a process-wide panic hook chained in front of the
//! previous one. The hook records `panicked at <location>` and a forced stack
//! capture into a thread-local slot, then calls the previous hook (so the usual
//! stderr report still happens). A panic is caught on the thread it was raised
//! on, so the slot read right after `catch_unwind` belongs to that panic.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if the isolated code holds a `Mutex` guard while panicking.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use futures::FutureExt;

const NO_TRACE: &str = "no trace captured";

thread_local! {
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// A caught panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Crash {
    /// Panic payload rendered as text.
    pub(crate) message: String,
    /// Location and stack recorded when the panic was raised.
    pub(crate) trace: String,
}

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown location".to_string());
            let trace = format!("panicked at {location}\n{}", Backtrace::force_capture());
            let _ = LAST_TRACE.try_with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn take_trace() -> String {
    LAST_TRACE
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(|| NO_TRACE.to_string())
}

fn into_crash(payload: Box<dyn Any + Send>) -> Crash {
    match payload.downcast::<Crash>() {
        Ok(crash) => *crash,
        Err(payload) => Crash {
            message: panic_message(&*payload),
            trace: take_trace(),
        },
    }
}

/// Polls `fut` to completion, converting a panic into `Err(Crash)`.
pub(crate) async fn isolate<F>(fut: F) -> Result<F::Output, Crash>
where
    F: Future,
{
    install_hook();
    AssertUnwindSafe(fut).catch_unwind().await.map_err(into_crash)
}

/// Runs `f`, converting a panic into `Err(Crash)`.
pub(crate) fn catch<R>(f: impl FnOnce() -> R) -> Result<R, Crash> {
    install_hook();
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(into_crash)
}

/// Re-raises a crash caught elsewhere; the nearest [`isolate`] keeps its trace.
pub(crate) fn resume(crash: Crash) -> ! {
    panic::resume_unwind(Box::new(crash))
}

/// Renders a panic payload as text (`&str` / `String`, otherwise a placeholder).
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(crash) = payload.downcast_ref::<Crash>() {
        crash.message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_output_through() {
        assert_eq!(isolate(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_static_str_payload() {
        let res: Result<(), Crash> = isolate(async {
            panic!("boom");
        })
        .await;
        assert_eq!(res.unwrap_err().message, "boom");
    }

    #[tokio::test]
    async fn test_formatted_payload() {
        let n = 3;
        let res: Result<(), Crash> = isolate(async move {
            panic!("bad index {n}");
        })
        .await;
        assert_eq!(res.unwrap_err().message, "bad index 3");
    }

    #[tokio::test]
    async fn test_opaque_payload() {
        let res: Result<(), Crash> = isolate(async {
            std::panic::panic_any(42_u8);
        })
        .await;
        assert_eq!(res.unwrap_err().message, "unknown panic");
    }

    #[tokio::test]
    async fn test_trace_names_the_panic_location() {
        let res: Result<(), Crash> = isolate(async {
            panic!("with trace");
        })
        .await;
        let crash = res.unwrap_err();
        assert!(crash.trace.starts_with("panicked at "), "{}", crash.trace);
        assert!(crash.trace.contains("boundary.rs"), "{}", crash.trace);
    }

    #[test]
    fn test_catch_then_resume_keeps_original_trace() {
        let crash = catch::<()>(|| panic!("on the pool")).unwrap_err();
        assert_eq!(crash.message, "on the pool");
        assert!(crash.trace.contains("boundary.rs"));

        let original = crash.clone();
        let again = catch::<()>(move || resume(crash)).unwrap_err();
        assert_eq!(again, original);
    }
}

//! # Caller-supplied shutdown procedure (`ShutdownFn`)
//!
//! The procedure performs process-wide teardown (stop accepting work, close
//! listeners). The supervisor invokes it at most once per run and passes the
//! [`ShutdownCause`] that won the race, so the caller can pick a stop policy
//! (for example: stop background workers only when the cause is fatal).
//!
//! ## Example
//! ```rust
//! use exitvisor::{ShutdownCause, ShutdownFn};
//!
//! let graceful = ShutdownFn::new(|cause: ShutdownCause| async move {
//!     if cause.is_fatal() {
//!         // stop workers without draining
//!     }
//! });
//! let blocking = ShutdownFn::blocking(|_cause| { /* close a std listener */ });
//! let nothing = ShutdownFn::noop();
//! # let _ = (graceful, blocking, nothing);
//! ```

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::core::{ShutdownCause, catch, resume};

type Procedure = Box<dyn FnOnce(ShutdownCause) -> BoxFuture<'static, ()> + Send>;

/// One-shot shutdown procedure.
pub struct ShutdownFn {
    procedure: Procedure,
}

impl ShutdownFn {
    /// Wraps an async procedure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(ShutdownCause) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            procedure: Box::new(move |cause| f(cause).boxed()),
        }
    }

    /// Wraps a synchronous procedure; it runs on the blocking thread pool.
    ///
    /// A panic inside `f` is caught on the pool thread, together with its trace,
    /// and re-raised on the awaiting task so the trigger's isolation boundary
    /// reports it.
    pub fn blocking<F>(f: F) -> Self
    where
        F: FnOnce(ShutdownCause) + Send + 'static,
    {
        Self::new(move |cause| async move {
            match tokio::task::spawn_blocking(move || catch(move || f(cause))).await {
                Ok(Ok(())) => {}
                Ok(Err(crash)) => resume(crash),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => {}
            }
        })
    }

    /// A procedure that does nothing; cancellation alone stops the actions.
    pub fn noop() -> Self {
        Self::new(|_| async {})
    }

    pub(crate) fn call(self, cause: ShutdownCause) -> BoxFuture<'static, ()> {
        (self.procedure)(cause)
    }
}

impl fmt::Debug for ShutdownFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownFn").finish_non_exhaustive()
    }
}

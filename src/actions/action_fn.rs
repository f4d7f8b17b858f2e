//! # Function-backed action (`ActionFn`)
//!
//! [`ActionFn`] wraps a closure `F: FnOnce(CancellationToken) -> Fut`. The closure
//! is called once, when the supervisor spawns the action.
//!
//! [`ActionFn::blocking`] runs a synchronous closure on tokio's blocking pool, for
//! work that blocks a thread (legacy servers, blocking I/O loops).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use exitvisor::{ActionError, ActionFn, ActionRef};
//!
//! let a: ActionRef = ActionFn::boxed("worker", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, ActionError>(())
//! });
//! assert_eq!(a.name(), "worker");
//!
//! let b: ActionRef = ActionFn::blocking("legacy", |_ctx: CancellationToken| Ok(()));
//! assert_eq!(b.name(), "legacy");
//! ```

use std::borrow::Cow;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::actions::action::{Action, ActionRef, BoxActionFuture};
use crate::core::{catch, resume};
use crate::error::ActionError;

/// Function-backed action implementation.
#[derive(Debug)]
pub struct ActionFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ActionFn<F> {
    /// Creates a new function-backed action.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> ActionFn<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    /// Creates the action and returns it as an owned handle (`Box<dyn Action>`).
    pub fn boxed(name: impl Into<Cow<'static, str>>, f: F) -> ActionRef {
        Box::new(Self::new(name, f))
    }
}

impl ActionFn<()> {
    /// Creates an action that runs `f` on the blocking thread pool.
    ///
    /// A panic inside `f` is caught on the pool thread, together with its trace,
    /// and re-raised on the awaiting task so the supervisor's isolation boundary
    /// reports it like any other action panic.
    pub fn blocking<G>(name: impl Into<Cow<'static, str>>, g: G) -> ActionRef
    where
        G: FnOnce(CancellationToken) -> Result<(), ActionError> + Send + 'static,
    {
        ActionFn::boxed(name, move |ctx: CancellationToken| async move {
            match tokio::task::spawn_blocking(move || catch(move || g(ctx))).await {
                Ok(Ok(res)) => res,
                Ok(Err(crash)) => resume(crash),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => Err(ActionError::Canceled),
            }
        })
    }
}

impl<F, Fut> Action for ActionFn<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(self: Box<Self>, ctx: CancellationToken) -> BoxActionFuture {
        let this = *self;
        Box::pin((this.f)(ctx))
    }
}

//! # Termination sources.
//!
//! A [`Termination`] completes when the process is asked to stop from the outside.
//! The default source, [`OsSignals`], listens to:
//!
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! Listeners are created inside [`Termination::requested`] and dropped with its
//! future, so every supervised run registers and unregisters its own interest.

use async_trait::async_trait;

/// Source of external termination requests.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tokio::sync::Notify;
/// use exitvisor::Termination;
///
/// /// Termination requested by the embedding application.
/// struct Manual(Arc<Notify>);
///
/// #[async_trait::async_trait]
/// impl Termination for Manual {
///     async fn requested(&self) -> std::io::Result<()> {
///         self.0.notified().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Termination: Send + Sync + 'static {
    /// Completes once a termination request arrives.
    ///
    /// Returns `Err` if the source cannot be registered.
    async fn requested(&self) -> std::io::Result<()>;
}

/// Operating-system interrupt/terminate signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignals;

#[async_trait]
impl Termination for OsSignals {
    async fn requested(&self) -> std::io::Result<()> {
        wait_for_shutdown_signal().await
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

use std::sync::Arc;

use super::{config::SupervisorConfig, shutdown::Termination, supervisor::Supervisor};
use crate::subscribers::Subscribe;

/// Builder for constructing a [`Supervisor`] with optional features.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    termination: Option<Arc<dyn Termination>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            termination: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (action lifecycle, shutdown, panics)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the termination source (default: [`OsSignals`](crate::OsSignals)).
    ///
    /// Useful when the embedding application owns signal handling, and in tests.
    pub fn with_termination(mut self, termination: Arc<dyn Termination>) -> Self {
        self.termination = Some(termination);
        self
    }

    /// Builds and returns the Supervisor instance.
    pub fn build(self) -> Supervisor {
        Supervisor::new_internal(self.cfg, self.subscribers, self.termination)
    }
}

//! The long-lived object graph shared by every invocation of an instance.

use std::time::{Duration, Instant};

use crate::dispatcher::Dispatcher;

/// Initialized application state: the routing table plus identifying
/// metadata.
///
/// Built once per execution environment by the context factory and then only
/// read. Shared clients are owned by the route handlers that use them, so
/// there is no mutable state here.
#[derive(Debug)]
pub struct ApplicationContext {
    service: String,
    dispatcher: Dispatcher,
    created_at: Instant,
}

impl ApplicationContext {
    pub fn new(service: impl Into<String>, dispatcher: Dispatcher) -> Self {
        Self {
            service: service.into(),
            dispatcher,
            created_at: Instant::now(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Time since this context was created, i.e. since the cold start.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

//! Per-invocation entrypoint and the cold/warm lifecycle.
//!
//! ```text
//!  Cold --init ok--> Warm --event--> Handling --response--> Warm
//!   |  ^
//!   +--+ init failed (invocation fails, next event retries)
//! ```
//!
//! Adapter and dispatcher failures become problem responses; only a failed
//! context initialization is reported to the runtime as an invocation error.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use lambda_runtime::LambdaEvent;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapter::RequestAdapter;
use crate::cold_start::ColdStartCache;
use crate::config::DEFAULT_TIMEOUT_MARGIN;
use crate::context::ApplicationContext;
use crate::error::InitError;
use crate::problem::{from_adapt_error, from_dispatch_error, ProblemDetails};
use crate::response::InternalResponse;

/// Lifecycle phase of the execution environment, as seen by the entrypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// No application context yet, or the last initialization failed.
    Cold = 0,
    /// Context initialized, idle between invocations.
    Warm = 1,
    /// An invocation is being handled.
    Handling = 2,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Phase::Warm,
            2 => Phase::Handling,
            _ => Phase::Cold,
        }
    }
}

/// The function the Lambda runtime invokes for every event.
///
/// Owns the adapter and the context factory; the process-wide
/// [`ColdStartCache`] is injected so it outlives any single entrypoint value.
pub struct InvocationEntrypoint<A, F> {
    cache: &'static ColdStartCache<ApplicationContext>,
    adapter: A,
    factory: F,
    timeout_margin: Duration,
    phase: AtomicU8,
}

impl<A, F> InvocationEntrypoint<A, F>
where
    A: RequestAdapter,
    F: Fn() -> Result<ApplicationContext, InitError> + Send + Sync,
{
    pub fn new(cache: &'static ColdStartCache<ApplicationContext>, adapter: A, factory: F) -> Self {
        let phase = if cache.is_initialized() {
            Phase::Warm
        } else {
            Phase::Cold
        };

        Self {
            cache,
            adapter,
            factory,
            timeout_margin: DEFAULT_TIMEOUT_MARGIN,
            phase: AtomicU8::new(phase as u8),
        }
    }

    /// Time kept in reserve before the platform deadline to emit a timeout
    /// response.
    pub fn with_timeout_margin(mut self, margin: Duration) -> Self {
        self.timeout_margin = margin;
        self
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// The initialized context, if the instance is warm.
    pub fn context(&self) -> Option<Arc<ApplicationContext>> {
        self.cache.get()
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Handle one invocation.
    ///
    /// Returns the platform response envelope, or an error only when the
    /// application context could not be initialized.
    pub async fn invoke(
        &self,
        event: LambdaEvent<Value>,
    ) -> Result<A::Envelope, lambda_runtime::Error> {
        let request_id = event.context.request_id.clone();
        let cold_start = !self.cache.is_initialized();

        // The factory runs on this thread; no deadline timer is armed until it
        // returns, so a slow cold start eats into the handler's budget below.
        let app = match self.cache.get_or_init(|| (self.factory)()) {
            Ok(app) => app,
            Err(err) => {
                self.set_phase(Phase::Cold);
                error!(
                    request_id = %request_id,
                    error = %err,
                    "cold start failed, invocation aborted"
                );
                return Err(err.into());
            }
        };

        self.set_phase(Phase::Handling);
        let started = Instant::now();
        let remaining = remaining_time(event.context.deadline);

        let response = self
            .handle(app, event.payload, &request_id, remaining)
            .await;

        info!(
            request_id = %request_id,
            status = response.status.as_u16(),
            cold_start = cold_start,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "invocation complete"
        );

        let envelope = self.adapter.to_envelope(response);
        self.set_phase(Phase::Warm);
        Ok(envelope)
    }

    async fn handle(
        &self,
        app: Arc<ApplicationContext>,
        payload: Value,
        request_id: &str,
        remaining: Option<Duration>,
    ) -> InternalResponse {
        let request = match self
            .adapter
            .parse_event(payload)
            .and_then(|event| self.adapter.to_internal(event))
        {
            Ok(request) => request,
            Err(err) => {
                warn!(request_id = %request_id, error = %err, "rejecting malformed event");
                return from_adapt_error(&err, request_id);
            }
        };

        info!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            "handling request"
        );

        // Handlers are synchronous and may block; keep them off the runtime
        // threads so the deadline timer can still fire.
        let task = tokio::task::spawn_blocking(move || app.dispatcher().dispatch(&request));

        let joined = match remaining {
            Some(remaining) => {
                let budget = remaining.saturating_sub(self.timeout_margin);
                match tokio::time::timeout(budget, task).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            request_id = %request_id,
                            budget_ms = budget.as_millis() as u64,
                            "invocation deadline reached, abandoning handler"
                        );
                        return ProblemDetails::timeout(request_id).into_response();
                    }
                }
            }
            None => task.await,
        };

        match joined {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => from_dispatch_error(&err, request_id),
            Err(err) => {
                error!(request_id = %request_id, error = %err, "dispatch task failed");
                ProblemDetails::internal_error(request_id).into_response()
            }
        }
    }
}

/// Time left until `deadline_ms` (milliseconds since the Unix epoch).
///
/// A zero deadline means the runtime did not supply one.
fn remaining_time(deadline_ms: u64) -> Option<Duration> {
    if deadline_ms == 0 {
        return None;
    }

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    Some(Duration::from_millis(deadline_ms.saturating_sub(now_ms)))
}

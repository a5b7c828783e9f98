//! # Event Dispatcher
//!
//! Drains an `mpsc` channel of [`OrchestratorEvent`]s and routes each one
//! through the [`HandlerRegistry`]. Events are handled one at a time, to
//! completion, which gives the single-writer-per-job guarantee the handlers
//! rely on.

use crate::context::ExecutionContext;
use crate::events::OrchestratorEvent;
use crate::logging::log_error;
use crate::registry::HandlerRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Counters reported when the event channel closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: usize,
    pub handled: usize,
    pub failed: usize,
}

pub struct EventDispatcher {
    registry: Arc<HandlerRegistry>,
    context: Arc<dyn ExecutionContext>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, context: Arc<dyn ExecutionContext>) -> Self {
        Self { registry, context }
    }

    /// Handle a single event; returns whether the handler succeeded
    pub fn dispatch_one(&self, event: &OrchestratorEvent) -> bool {
        match self.registry.dispatch(self.context.as_ref(), event) {
            Ok(()) => true,
            Err(err) => {
                log_error(
                    "dispatcher",
                    event.event_type(),
                    &err.to_string(),
                    event.job_id().map(|id| format!("job {id}")).as_deref(),
                );
                false
            }
        }
    }

    /// Process events until every sender is dropped
    pub async fn run(self, mut events: mpsc::Receiver<OrchestratorEvent>) -> DispatchStats {
        let mut stats = DispatchStats::default();
        info!("🚀 Event dispatcher started");

        while let Some(event) = events.recv().await {
            stats.received += 1;
            debug!(event_type = event.event_type(), job_id = event.job_id(), "Event received");
            if self.dispatch_one(&event) {
                stats.handled += 1;
            } else {
                stats.failed += 1;
            }
        }

        info!(
            received = stats.received,
            handled = stats.handled,
            failed = stats.failed,
            "Event dispatcher stopped"
        );
        stats
    }
}

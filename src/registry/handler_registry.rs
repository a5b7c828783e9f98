//! # Handler Registry
//!
//! Processor handlers keyed by processor id, with a short-name index.
//! Events are routed to their handler through the framework wrappers.

use crate::context::ExecutionContext;
use crate::error::{OrchestratorError, Result};
use crate::events::OrchestratorEvent;
use crate::models::ProcessorId;
use crate::orchestration::framework;
use crate::orchestration::handler::ProcessorHandler;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_handlers: usize,
    pub processors: Vec<String>,
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<ProcessorId, Arc<dyn ProcessorHandler>>,
    short_names: HashMap<String, ProcessorId>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its descriptor's id and short name, replacing
    /// any handler previously registered for that processor
    pub fn register(&mut self, handler: Arc<dyn ProcessorHandler>) {
        let descriptor = handler.descriptor().clone();
        if let Some(previous) = self.handlers.get(&descriptor.id) {
            let previous_name = previous.descriptor().short_name.clone();
            warn!(
                processor_id = descriptor.id,
                processor = %descriptor.short_name,
                previous = %previous_name,
                "Replacing previously registered processor handler"
            );
            if self.short_names.get(&previous_name) == Some(&descriptor.id) {
                self.short_names.remove(&previous_name);
            }
        }
        self.short_names
            .insert(descriptor.short_name.clone(), descriptor.id);
        self.handlers.insert(descriptor.id, handler);

        info!(
            processor_id = descriptor.id,
            processor = %descriptor.short_name,
            "📚 Processor handler registered"
        );
    }

    pub fn handler(&self, processor_id: ProcessorId) -> Result<Arc<dyn ProcessorHandler>> {
        self.handlers
            .get(&processor_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownProcessor {
                processor: processor_id.to_string(),
            })
    }

    pub fn handler_by_short_name(&self, short_name: &str) -> Result<Arc<dyn ProcessorHandler>> {
        self.short_names
            .get(short_name)
            .and_then(|id| self.handlers.get(id))
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownProcessor {
                processor: short_name.to_string(),
            })
    }

    /// Route one event through the framework wrapper of its handler.
    /// Product availability is offered to every registered handler.
    pub fn dispatch(&self, ctx: &dyn ExecutionContext, event: &OrchestratorEvent) -> Result<()> {
        debug!(event_type = event.event_type(), job_id = event.job_id(), "Dispatching event");
        match event {
            OrchestratorEvent::JobSubmitted(evt) => {
                let handler = self.handler(evt.processor_id)?;
                framework::handle_job_submitted(handler.as_ref(), ctx, evt)
            }
            OrchestratorEvent::TaskFinished(evt) => {
                let handler = self.handler(evt.processor_id)?;
                framework::handle_task_finished(handler.as_ref(), ctx, evt)
            }
            OrchestratorEvent::ProductAvailable(evt) => {
                for handler in self.handlers.values() {
                    framework::handle_product_available(handler.as_ref(), ctx, evt)?;
                }
                Ok(())
            }
        }
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_handlers: self.handlers.len(),
            processors: self
                .handlers
                .values()
                .map(|h| h.descriptor().short_name.clone())
                .collect(),
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("processors", &self.stats().processors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::config::ConfigurationParameterValueMap;
    use crate::context::{InMemoryExecutionContext, SchedulingContext};
    use crate::events::{JobSubmittedEvent, ProductAvailableEvent, TaskFinishedEvent};
    use crate::models::{Job, ProcessorDescriptor, ProductType, SiteId};
    use crate::orchestration::handler::ProcessorJobDefinitionParams;
    use crate::state_machine::JobState;
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use serde_json::json;

    struct RecordingHandler {
        descriptor: ProcessorDescriptor,
        fail_submission: bool,
        seen: Mutex<Vec<String>>,
    }

    impl RecordingHandler {
        fn new(id: i64, short_name: &str, fail_submission: bool) -> Arc<Self> {
            Arc::new(Self {
                descriptor: ProcessorDescriptor::new(id, short_name, short_name.to_uppercase()),
                fail_submission,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl ProcessorHandler for RecordingHandler {
        fn descriptor(&self) -> &ProcessorDescriptor {
            &self.descriptor
        }

        fn handle_job_submitted(
            &self,
            _ctx: &dyn ExecutionContext,
            event: &JobSubmittedEvent,
        ) -> Result<()> {
            self.seen.lock().push(format!("submitted:{}", event.job_id));
            if self.fail_submission {
                return Err(OrchestratorError::NoInputProducts {
                    job_id: event.job_id,
                    reason: "nothing to do".to_string(),
                });
            }
            Ok(())
        }

        fn handle_task_finished(
            &self,
            _ctx: &dyn ExecutionContext,
            event: &TaskFinishedEvent,
        ) -> Result<()> {
            self.seen.lock().push(format!("finished:{}", event.task_id));
            Ok(())
        }

        fn handle_product_available(
            &self,
            _ctx: &dyn ExecutionContext,
            event: &ProductAvailableEvent,
        ) -> Result<()> {
            self.seen.lock().push(format!("product:{}", event.product_id));
            Ok(())
        }

        fn processing_definition(
            &self,
            _ctx: &dyn SchedulingContext,
            _site_id: SiteId,
            _scheduled_date: NaiveDate,
            _request_overrides: &ConfigurationParameterValueMap,
        ) -> Result<ProcessorJobDefinitionParams> {
            Ok(ProcessorJobDefinitionParams::invalid())
        }
    }

    fn context() -> InMemoryExecutionContext {
        let ctx = InMemoryExecutionContext::new(Arc::new(InMemoryCatalog::new()), "/jobs");
        ctx.register_job(Job::new(1, 10, 3, json!({})));
        ctx
    }

    #[test]
    fn test_lookup_by_id_and_short_name() {
        let mut registry = HandlerRegistry::new();
        registry.register(RecordingHandler::new(3, "l3b", false));

        assert_eq!(registry.handler(3).unwrap().descriptor().short_name, "l3b");
        assert_eq!(registry.handler_by_short_name("l3b").unwrap().descriptor().id, 3);

        let err = registry.handler(99).err().unwrap();
        assert!(err.is_fatal());
        assert!(registry.handler_by_short_name("l4a").is_err());
    }

    #[test]
    fn test_dispatch_routes_by_processor() {
        let ctx = context();
        let lai = RecordingHandler::new(3, "l3b", false);
        let composite = RecordingHandler::new(2, "l3a", false);
        let mut registry = HandlerRegistry::new();
        registry.register(lai.clone());
        registry.register(composite.clone());

        let submitted =
            OrchestratorEvent::JobSubmitted(JobSubmittedEvent::new(1, 10, 3, &json!({})));
        registry.dispatch(&ctx, &submitted).unwrap();
        let finished = OrchestratorEvent::TaskFinished(TaskFinishedEvent {
            job_id: 1,
            processor_id: 3,
            site_id: 10,
            task_id: 4,
            module: "lai-processor".to_string(),
        });
        registry.dispatch(&ctx, &finished).unwrap();

        assert_eq!(*lai.seen.lock(), vec!["submitted:1", "finished:4"]);
        assert!(composite.seen.lock().is_empty());
    }

    #[test]
    fn test_product_available_reaches_every_handler() {
        let ctx = context();
        let lai = RecordingHandler::new(3, "l3b", false);
        let composite = RecordingHandler::new(2, "l3a", false);
        let mut registry = HandlerRegistry::new();
        registry.register(lai.clone());
        registry.register(composite.clone());

        let event = OrchestratorEvent::ProductAvailable(ProductAvailableEvent {
            product_id: 42,
            site_id: 10,
            product_type: ProductType::L2a,
        });
        registry.dispatch(&ctx, &event).unwrap();

        assert_eq!(*lai.seen.lock(), vec!["product:42"]);
        assert_eq!(*composite.seen.lock(), vec!["product:42"]);
    }

    #[test]
    fn test_submission_failure_marks_job_failed() {
        let ctx = context();
        let mut registry = HandlerRegistry::new();
        registry.register(RecordingHandler::new(3, "l3b", true));

        let event = OrchestratorEvent::JobSubmitted(JobSubmittedEvent::new(1, 10, 3, &json!({})));
        let err = registry.dispatch(&ctx, &event).unwrap_err();

        assert!(matches!(err, OrchestratorError::NoInputProducts { .. }));
        let job = ctx.job(1).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.failure_message, Some(err.to_string()));
    }

    #[test]
    fn test_unknown_processor_event() {
        let ctx = context();
        let registry = HandlerRegistry::new();
        let event = OrchestratorEvent::JobSubmitted(JobSubmittedEvent::new(1, 10, 3, &json!({})));

        let err = registry.dispatch(&ctx, &event).unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownProcessor { .. }));
        assert_eq!(ctx.job_state(1), Some(JobState::Submitted));
    }

    #[test]
    fn test_replacement_and_stats() {
        let mut registry = HandlerRegistry::new();
        registry.register(RecordingHandler::new(3, "l3b", false));
        registry.register(RecordingHandler::new(3, "l3b", true));
        registry.register(RecordingHandler::new(2, "l3a", false));

        let stats = registry.stats();
        assert_eq!(stats.total_handlers, 2);
        assert_eq!(stats.processors, vec!["l3a".to_string(), "l3b".to_string()]);
    }

    #[test]
    fn test_renamed_replacement_drops_old_short_name() {
        let mut registry = HandlerRegistry::new();
        registry.register(RecordingHandler::new(3, "l3b", false));
        registry.register(RecordingHandler::new(3, "l3b_lai", false));

        assert!(registry.handler_by_short_name("l3b").is_err());
        assert_eq!(registry.handler_by_short_name("l3b_lai").unwrap().descriptor().id, 3);
        assert_eq!(registry.stats().processors, vec!["l3b_lai".to_string()]);
    }
}

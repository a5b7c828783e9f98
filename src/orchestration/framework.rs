//! # Handler Framework Boundary
//!
//! Uniform entry points wrapping every [`ProcessorHandler`] capability.
//!
//! Job submission is the only place where a handler error is translated into a
//! job-state change: the job is marked failed exactly once with the error
//! message and the original error is returned. A failure while marking the job
//! is logged and never replaces the original error. Task-finished and
//! product-available errors propagate untouched.

use super::handler::{ProcessorHandler, ProcessorJobDefinitionParams};
use crate::config::ConfigurationParameterValueMap;
use crate::context::{ExecutionContext, SchedulingContext};
use crate::error::Result;
use crate::events::{JobSubmittedEvent, ProductAvailableEvent, TaskFinishedEvent};
use crate::logging::{log_error, log_job_operation};
use crate::models::SiteId;
use chrono::NaiveDate;
use tracing::{instrument, warn};

#[instrument(
    skip_all,
    fields(
        job_id = event.job_id,
        site_id = event.site_id,
        processor = %handler.descriptor().short_name
    )
)]
pub fn handle_job_submitted(
    handler: &dyn ProcessorHandler,
    ctx: &dyn ExecutionContext,
    event: &JobSubmittedEvent,
) -> Result<()> {
    let processor = handler.descriptor().short_name.as_str();

    match handler.handle_job_submitted(ctx, event) {
        Ok(()) => {
            log_job_operation(
                "job_submitted",
                event.job_id,
                Some(processor),
                Some(event.site_id),
                "tasks_submitted",
                None,
            );
            Ok(())
        }
        Err(err) => {
            let message = err.to_string();
            log_job_operation(
                "job_submitted",
                event.job_id,
                Some(processor),
                Some(event.site_id),
                "failed",
                Some(&message),
            );
            if let Err(secondary) = ctx.mark_job_failed(event.job_id, &message) {
                warn!(
                    job_id = event.job_id,
                    error = %secondary,
                    "Unable to mark job as failed"
                );
            }
            Err(err)
        }
    }
}

#[instrument(
    skip_all,
    fields(job_id = event.job_id, task_id = event.task_id, module = %event.module)
)]
pub fn handle_task_finished(
    handler: &dyn ProcessorHandler,
    ctx: &dyn ExecutionContext,
    event: &TaskFinishedEvent,
) -> Result<()> {
    handler.handle_task_finished(ctx, event).inspect_err(|err| {
        log_error(
            "framework",
            "handle_task_finished",
            &err.to_string(),
            Some(&format!("job {} task {}", event.job_id, event.task_id)),
        );
    })
}

#[instrument(skip_all, fields(product_id = event.product_id, site_id = event.site_id))]
pub fn handle_product_available(
    handler: &dyn ProcessorHandler,
    ctx: &dyn ExecutionContext,
    event: &ProductAvailableEvent,
) -> Result<()> {
    handler.handle_product_available(ctx, event)
}

pub fn processing_definition(
    handler: &dyn ProcessorHandler,
    ctx: &dyn SchedulingContext,
    site_id: SiteId,
    scheduled_date: NaiveDate,
    request_overrides: &ConfigurationParameterValueMap,
) -> Result<ProcessorJobDefinitionParams> {
    handler.processing_definition(ctx, site_id, scheduled_date, request_overrides)
}

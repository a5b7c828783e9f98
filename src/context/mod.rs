//! # Processing Contexts
//!
//! Capabilities handed to processor handlers. [`ExecutionContext`] serves event
//! handling (configuration snapshots, job folders, task submission and job state
//! changes); [`SchedulingContext`] serves processing-definition queries issued by
//! the scheduler.

pub mod memory;

pub use memory::InMemoryExecutionContext;

use crate::catalog::CatalogGateway;
use crate::config::ConfigurationParameterValueMap;
use crate::error::Result;
use crate::models::{JobId, ProcessorId, SiteId, TaskId};
use crate::orchestration::types::SubmissionBatch;
use std::path::PathBuf;

pub trait ExecutionContext: Send + Sync {
    fn catalog(&self) -> &dyn CatalogGateway;

    /// Configuration snapshot of a job restricted to keys starting with `prefix`
    fn job_configuration(
        &self,
        job_id: JobId,
        prefix: &str,
    ) -> Result<ConfigurationParameterValueMap>;

    /// Private working folder of a job, `<jobs_root>/<job_id>-<processor>`
    fn job_output_path(&self, job_id: JobId, processor_short_name: &str) -> PathBuf;

    fn task_output_path(
        &self,
        job_id: JobId,
        processor_short_name: &str,
        task_id: TaskId,
        module: &str,
    ) -> PathBuf {
        self.job_output_path(job_id, processor_short_name)
            .join(format!("{task_id}-{module}"))
    }

    /// Hand the complete task list of a job invocation to the execution engine
    fn submit_tasks(&self, batch: SubmissionBatch) -> Result<()>;

    fn mark_job_failed(&self, job_id: JobId, message: &str) -> Result<()>;

    fn mark_job_finished(&self, job_id: JobId) -> Result<()>;
}

pub trait SchedulingContext: Send + Sync {
    fn catalog(&self) -> &dyn CatalogGateway;

    /// Processor configuration for a site with request-level overrides applied
    fn processor_configuration(
        &self,
        processor_id: ProcessorId,
        site_id: SiteId,
        prefix: &str,
        request_overrides: &ConfigurationParameterValueMap,
    ) -> Result<ConfigurationParameterValueMap>;
}

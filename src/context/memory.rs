//! In-process execution and scheduling context backed by [`InMemoryCatalog`].

use super::{ExecutionContext, SchedulingContext};
use crate::catalog::{CatalogGateway, InMemoryCatalog};
use crate::config::{ConfigurationParameterValueMap, OrchestratorConfig, ParameterSource};
use crate::error::{OrchestratorError, Result};
use crate::logging::log_job_operation;
use crate::models::{Job, JobId, ProcessorId, SiteId};
use crate::orchestration::task_graph::validate_batch;
use crate::orchestration::types::SubmissionBatch;
use crate::state_machine::{JobEvent, JobState, JobStateMachine};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

pub struct InMemoryExecutionContext {
    catalog: Arc<InMemoryCatalog>,
    jobs_root: PathBuf,
    global_parameters: BTreeMap<String, String>,
    processor_defaults: DashMap<ProcessorId, BTreeMap<String, String>>,
    job_parameters: DashMap<JobId, BTreeMap<String, String>>,
    submitted: DashMap<JobId, Vec<SubmissionBatch>>,
    submission_sink: Option<UnboundedSender<SubmissionBatch>>,
}

impl InMemoryExecutionContext {
    pub fn new(catalog: Arc<InMemoryCatalog>, jobs_root: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            jobs_root: jobs_root.into(),
            global_parameters: BTreeMap::new(),
            processor_defaults: DashMap::new(),
            job_parameters: DashMap::new(),
            submitted: DashMap::new(),
            submission_sink: None,
        }
    }

    /// Context seeded with the processors and shared parameters of a loaded
    /// configuration. Processors are registered in the catalog as well.
    pub fn from_config(config: &OrchestratorConfig, catalog: Arc<InMemoryCatalog>) -> Self {
        let context = Self::new(catalog, config.paths.jobs_root.clone())
            .with_global_parameters(config.parameters.clone());
        for processor in &config.processors {
            context.catalog.add_processor(processor.descriptor());
            context
                .processor_defaults
                .insert(processor.id, processor.defaults.clone());
        }
        context
    }

    pub fn with_global_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.global_parameters = parameters;
        self
    }

    /// Forward every submitted batch to an execution engine
    pub fn with_submission_sink(mut self, sink: UnboundedSender<SubmissionBatch>) -> Self {
        self.submission_sink = Some(sink);
        self
    }

    pub fn set_processor_default(&self, processor_id: ProcessorId, key: &str, value: &str) {
        self.processor_defaults
            .entry(processor_id)
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Job-scoped configuration value, overriding processor defaults
    pub fn set_job_parameter(&self, job_id: JobId, key: &str, value: &str) {
        self.job_parameters
            .entry(job_id)
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn register_job(&self, job: Job) {
        self.catalog.add_job(job);
    }

    pub fn job_state(&self, job_id: JobId) -> Option<JobState> {
        self.catalog.job(job_id).map(|j| j.state)
    }

    pub fn job(&self, job_id: JobId) -> Option<Job> {
        self.catalog.job(job_id)
    }

    pub fn submitted_batches(&self, job_id: JobId) -> Vec<SubmissionBatch> {
        self.submitted
            .get(&job_id)
            .map(|batches| batches.value().clone())
            .unwrap_or_default()
    }

    fn default_layer(&self, processor_id: ProcessorId) -> ConfigurationParameterValueMap {
        let mut map = ConfigurationParameterValueMap::new();
        for (key, value) in &self.global_parameters {
            map.set(key, value, ParameterSource::ProcessorDefault);
        }
        if let Some(defaults) = self.processor_defaults.get(&processor_id) {
            for (key, value) in defaults.iter() {
                map.set(key, value, ParameterSource::ProcessorDefault);
            }
        }
        map
    }

    fn apply_event(&self, job_id: JobId, event: JobEvent) -> Result<JobState> {
        let job = self
            .catalog
            .job(job_id)
            .ok_or_else(|| {
                OrchestratorError::catalog("job_state", format!("unknown job {job_id}"))
            })?;
        let target = JobStateMachine::transition(job.state, &event)?;
        self.catalog
            .update_job(job_id, target, event.error_message().map(str::to_string))?;
        Ok(target)
    }
}

impl ExecutionContext for InMemoryExecutionContext {
    fn catalog(&self) -> &dyn CatalogGateway {
        &*self.catalog
    }

    fn job_configuration(
        &self,
        job_id: JobId,
        prefix: &str,
    ) -> Result<ConfigurationParameterValueMap> {
        let job = self.catalog.job(job_id).ok_or_else(|| {
            OrchestratorError::catalog("job_configuration", format!("unknown job {job_id}"))
        })?;

        let mut map = self.default_layer(job.processor_id);
        if let Some(values) = self.job_parameters.get(&job_id) {
            for (key, value) in values.iter() {
                map.set(key, value, ParameterSource::Job);
            }
        }
        Ok(map.with_prefix(prefix))
    }

    fn job_output_path(&self, job_id: JobId, processor_short_name: &str) -> PathBuf {
        self.jobs_root
            .join(format!("{job_id}-{processor_short_name}"))
    }

    fn submit_tasks(&self, batch: SubmissionBatch) -> Result<()> {
        validate_batch(&batch)?;

        let job_id = batch.job_id;
        if self.job_state(job_id) == Some(JobState::Submitted) {
            self.apply_event(job_id, JobEvent::Start)?;
        }

        info!(
            job_id,
            processor = %batch.processor,
            tasks = batch.tasks.len(),
            parallelize_products = batch.hints.parallelize_products,
            "Submitting task batch"
        );

        if let Some(sink) = &self.submission_sink {
            if sink.send(batch.clone()).is_err() {
                warn!(job_id, "Execution engine is no longer receiving batches");
            }
        }
        self.submitted.entry(job_id).or_default().push(batch);
        Ok(())
    }

    fn mark_job_failed(&self, job_id: JobId, message: &str) -> Result<()> {
        self.apply_event(job_id, JobEvent::Fail(message.to_string()))?;
        log_job_operation("mark_failed", job_id, None, None, "failed", Some(message));
        Ok(())
    }

    fn mark_job_finished(&self, job_id: JobId) -> Result<()> {
        self.apply_event(job_id, JobEvent::Succeed)?;
        log_job_operation("mark_finished", job_id, None, None, "succeeded", None);
        Ok(())
    }
}

impl SchedulingContext for InMemoryExecutionContext {
    fn catalog(&self) -> &dyn CatalogGateway {
        &*self.catalog
    }

    fn processor_configuration(
        &self,
        processor_id: ProcessorId,
        _site_id: SiteId,
        prefix: &str,
        request_overrides: &ConfigurationParameterValueMap,
    ) -> Result<ConfigurationParameterValueMap> {
        let mut map = self.default_layer(processor_id);
        for (key, value) in request_overrides.iter() {
            map.set(key, value, ParameterSource::Request);
        }
        Ok(map.with_prefix(prefix))
    }
}

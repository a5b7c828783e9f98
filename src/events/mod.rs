//! # Inbound Events
//!
//! Events delivered by the surrounding dispatch layer. Each event is routed to
//! the handler registered for its processor.

use crate::error::{OrchestratorError, Result};
use crate::models::{JobId, ProcessorId, ProductId, ProductType, SiteId, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmittedEvent {
    pub job_id: JobId,
    pub site_id: SiteId,
    pub processor_id: ProcessorId,
    /// Raw JSON parameter blob of the job
    pub parameters_json: String,
}

impl JobSubmittedEvent {
    pub fn new(
        job_id: JobId,
        site_id: SiteId,
        processor_id: ProcessorId,
        parameters: &serde_json::Value,
    ) -> Self {
        Self {
            job_id,
            site_id,
            processor_id,
            parameters_json: parameters.to_string(),
        }
    }

    /// Parameters as a JSON object; an empty blob is an empty object
    pub fn parameters(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        if self.parameters_json.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str::<serde_json::Value>(&self.parameters_json) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(OrchestratorError::invalid_parameter(
                "parameters_json",
                other.to_string(),
                "job parameters must be a JSON object",
            )),
            Err(e) => Err(OrchestratorError::json(
                format!("parameters of job {}", self.job_id),
                e,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFinishedEvent {
    pub job_id: JobId,
    pub processor_id: ProcessorId,
    pub site_id: SiteId,
    pub task_id: TaskId,
    /// Module name of the finished task
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAvailableEvent {
    pub product_id: ProductId,
    pub site_id: SiteId,
    pub product_type: ProductType,
}

/// Any event the orchestrator reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrchestratorEvent {
    JobSubmitted(JobSubmittedEvent),
    TaskFinished(TaskFinishedEvent),
    ProductAvailable(ProductAvailableEvent),
}

impl OrchestratorEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JobSubmitted(_) => "job_submitted",
            Self::TaskFinished(_) => "task_finished",
            Self::ProductAvailable(_) => "product_available",
        }
    }

    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::JobSubmitted(evt) => Some(evt.job_id),
            Self::TaskFinished(evt) => Some(evt.job_id),
            Self::ProductAvailable(_) => None,
        }
    }
}

//! # Processor Handler Contract
//!
//! Capability set every product-type handler implements. Handlers are looked
//! up by processor in the [`HandlerRegistry`](crate::registry::HandlerRegistry)
//! and always invoked through the wrappers in
//! [`framework`](super::framework), which own the job-failure boundary.

use crate::config::ConfigurationParameterValueMap;
use crate::context::{ExecutionContext, SchedulingContext};
use crate::error::Result;
use crate::events::{JobSubmittedEvent, ProductAvailableEvent, TaskFinishedEvent};
use crate::models::{ProcessorDescriptor, Product, SiteId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What the next scheduled run of a processor on a site would need
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorJobDefinitionParams {
    pub is_valid: bool,
    pub product_list: Vec<Product>,
    /// Parameter blob to submit the job with
    pub json_parameters: serde_json::Value,
}

impl ProcessorJobDefinitionParams {
    pub fn invalid() -> Self {
        Self::default()
    }
}

pub trait ProcessorHandler: Send + Sync {
    fn descriptor(&self) -> &ProcessorDescriptor;

    /// Build and submit the task graph of a newly submitted job
    fn handle_job_submitted(
        &self,
        ctx: &dyn ExecutionContext,
        event: &JobSubmittedEvent,
    ) -> Result<()>;

    /// React to the completion of one of the job's tasks
    fn handle_task_finished(
        &self,
        ctx: &dyn ExecutionContext,
        event: &TaskFinishedEvent,
    ) -> Result<()>;

    fn handle_product_available(
        &self,
        _ctx: &dyn ExecutionContext,
        _event: &ProductAvailableEvent,
    ) -> Result<()> {
        Ok(())
    }

    /// Describe the job a scheduler should submit for `site_id` on `scheduled_date`
    fn processing_definition(
        &self,
        ctx: &dyn SchedulingContext,
        site_id: SiteId,
        scheduled_date: NaiveDate,
        request_overrides: &ConfigurationParameterValueMap,
    ) -> Result<ProcessorJobDefinitionParams>;
}

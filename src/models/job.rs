use super::{JobId, ProcessorId, SiteId};
use crate::state_machine::JobState;
use serde::{Deserialize, Serialize};

/// One request to produce a derived product for a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub site_id: SiteId,
    pub processor_id: ProcessorId,
    /// Free-form parameter blob supplied at submission
    pub parameters: serde_json::Value,
    pub state: JobState,
    /// Message of the error that moved the job to `failed`
    pub failure_message: Option<String>,
}

impl Job {
    pub fn new(
        id: JobId,
        site_id: SiteId,
        processor_id: ProcessorId,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            id,
            site_id,
            processor_id,
            parameters,
            state: JobState::Submitted,
            failure_message: None,
        }
    }
}

use super::{JobEvent, JobState};
use crate::error::{OrchestratorError, Result};
use tracing::debug;

/// Pure transition table for job lifecycle events
#[derive(Debug, Clone, Copy, Default)]
pub struct JobStateMachine;

impl JobStateMachine {
    /// Resolve the state reached from `current` on `event`.
    pub fn transition(current: JobState, event: &JobEvent) -> Result<JobState> {
        let target = match (current, event) {
            (JobState::Submitted, JobEvent::Start) => JobState::Running,

            (JobState::Submitted, JobEvent::Succeed) => JobState::Succeeded,
            (JobState::Running, JobEvent::Succeed) => JobState::Succeeded,

            (JobState::Submitted, JobEvent::Fail(_)) => JobState::Failed,
            (JobState::Running, JobEvent::Fail(_)) => JobState::Failed,

            (from_state, _) => {
                return Err(OrchestratorError::InvalidStateTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        debug!(
            from = %current,
            to = %target,
            event = event.event_type(),
            "Job state transition"
        );
        Ok(target)
    }
}

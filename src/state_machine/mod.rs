//! # Job State Machine
//!
//! Lifecycle of a processing job: `submitted -> running -> succeeded | failed`.
//! Terminal states are final; any transition out of them is rejected.

pub mod events;
pub mod job_state_machine;
pub mod states;

pub use events::JobEvent;
pub use job_state_machine::JobStateMachine;
pub use states::JobState;

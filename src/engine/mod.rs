//! # Local Execution Engine
//!
//! Executes submitted task batches as local processes. The orchestration core
//! only submits batches and consumes completion events; this engine is the
//! in-process stand-in for the external executor.

pub mod local_engine;
pub mod step_runner;

pub use local_engine::{BatchOrigin, ExecutionReport, LocalExecutionEngine};
pub use step_runner::{ProcessStepRunner, StepRunner};

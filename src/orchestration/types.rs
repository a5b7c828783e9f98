//! Task and step model handed to the execution engine.

use crate::models::{JobId, TaskId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single external-program invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Position of the step inside its task
    pub index: usize,
    /// Logical step name, e.g. `lai-processor`
    pub name: String,
    /// Executable actually launched
    pub program: String,
    pub arguments: Vec<String>,
    pub working_dir: PathBuf,
}

impl Step {
    /// Full command line, program first
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.arguments.iter().cloned())
            .collect()
    }
}

/// Dependency-tracked unit of work made of sequential steps.
///
/// A task is eligible only once all its parents have completed. It is never
/// modified after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub job_id: JobId,
    /// External program family the task belongs to
    pub module: String,
    pub steps: Vec<Step>,
    pub parents: Vec<TaskId>,
    /// Private output folder of the task
    pub output_dir: PathBuf,
}

/// Scheduling hints consumed by the execution engine; not enforced by builders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHints {
    /// Independent task chains may run concurrently
    pub parallelize_products: bool,
}

/// Complete task list of one job invocation, submitted once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionBatch {
    pub job_id: JobId,
    pub processor: String,
    pub tasks: Vec<Task>,
    pub hints: ExecutionHints,
}

impl SubmissionBatch {
    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn step_count(&self) -> usize {
        self.tasks.iter().map(|t| t.steps.len()).sum()
    }
}

//! Task Graph Construction
//!
//! Builds the task list of one job invocation. Task ids are assigned in
//! creation order and a task may only name parents that already exist in the
//! graph, so the result is acyclic by construction.

use super::step_decorator::StepDecorator;
use super::types::{ExecutionHints, SubmissionBatch, Task};
use crate::error::{OrchestratorError, Result};
use crate::models::{JobId, TaskId};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

#[derive(Debug)]
pub struct TaskGraph {
    job_id: JobId,
    decorator: StepDecorator,
    job_output_dir: PathBuf,
    tasks: Vec<Task>,
}

impl TaskGraph {
    pub fn new(
        job_id: JobId,
        job_output_dir: impl Into<PathBuf>,
        decorator: StepDecorator,
    ) -> Self {
        Self {
            job_id,
            decorator,
            job_output_dir: job_output_dir.into(),
            tasks: Vec::new(),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Create an empty task depending on `parents`.
    ///
    /// Parents must already belong to this graph; anything else is a
    /// programming error in the calling builder.
    pub fn add_task(&mut self, module: &str, parents: &[TaskId]) -> Result<TaskId> {
        let id = self.tasks.len() as TaskId + 1;

        let mut seen = HashSet::new();
        let mut unique_parents = Vec::with_capacity(parents.len());
        for &parent_id in parents {
            if self.task(parent_id).is_none() {
                return Err(OrchestratorError::UnknownParentTask {
                    task_id: id,
                    parent_id,
                });
            }
            if seen.insert(parent_id) {
                unique_parents.push(parent_id);
            }
        }

        self.tasks.push(Task {
            id,
            job_id: self.job_id,
            module: module.to_string(),
            steps: Vec::new(),
            parents: unique_parents,
            output_dir: self.job_output_dir.join(format!("{id}-{module}")),
        });
        Ok(id)
    }

    /// Append a decorated step to an existing task
    pub fn add_step(
        &mut self,
        task_id: TaskId,
        step_name: &str,
        arguments: Vec<String>,
    ) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(OrchestratorError::UnknownTask { task_id })?;
        self.decorator.append_step(task, step_name, arguments);
        Ok(())
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks no other task depends on
    pub fn leaves(&self) -> Vec<TaskId> {
        let referenced: BTreeSet<TaskId> = self
            .tasks
            .iter()
            .flat_map(|t| t.parents.iter().copied())
            .collect();
        self.tasks
            .iter()
            .map(|t| t.id)
            .filter(|id| !referenced.contains(id))
            .collect()
    }

    pub fn into_batch(self, hints: ExecutionHints) -> SubmissionBatch {
        SubmissionBatch {
            job_id: self.job_id,
            processor: self.decorator.processor_short_name().to_string(),
            tasks: self.tasks,
            hints,
        }
    }
}

/// Check that every parent reference of a batch resolves inside the batch and
/// points to an earlier task.
pub fn validate_batch(batch: &SubmissionBatch) -> Result<()> {
    let mut known = HashSet::new();
    for task in &batch.tasks {
        for &parent_id in &task.parents {
            if !known.contains(&parent_id) {
                return Err(OrchestratorError::UnknownParentTask {
                    task_id: task.id,
                    parent_id,
                });
            }
        }
        known.insert(task.id);
    }
    Ok(())
}

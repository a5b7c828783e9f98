//! # Local Execution Engine
//!
//! Runs a [`SubmissionBatch`] on the local machine. A task starts once all of
//! its parents completed; the steps of a task run in order. Independent tasks
//! run concurrently only when the batch allows parallel products, bounded by
//! `engine.max_parallel_tasks`.
//!
//! Dependents of a failed task are skipped. Every completed task is reported as
//! a [`TaskFinishedEvent`] on the optional event sink, parents before children.

use super::step_runner::StepRunner;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::{OrchestratorEvent, TaskFinishedEvent};
use crate::logging::log_task_operation;
use crate::models::{JobId, ProcessorId, SiteId, TaskId};
use crate::orchestration::{SubmissionBatch, Task};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Outcome of one batch execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub job_id: JobId,
    /// Completed tasks in completion order
    pub completed: Vec<TaskId>,
    pub failed: Vec<TaskId>,
    /// Tasks never started because an ancestor failed
    pub skipped: Vec<TaskId>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Identity stamped on the emitted completion events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOrigin {
    pub processor_id: ProcessorId,
    pub site_id: SiteId,
}

pub struct LocalExecutionEngine {
    runner: Arc<dyn StepRunner>,
    max_parallel_tasks: usize,
    events: Option<mpsc::Sender<OrchestratorEvent>>,
}

impl LocalExecutionEngine {
    pub fn new(runner: Arc<dyn StepRunner>, config: &EngineConfig) -> Self {
        Self {
            runner,
            max_parallel_tasks: config.max_parallel_tasks.max(1),
            events: None,
        }
    }

    pub fn with_event_sink(mut self, events: mpsc::Sender<OrchestratorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    async fn run_task(&self, task: &Task) -> (TaskId, Result<()>) {
        log_task_operation(
            "task_started",
            task.job_id,
            Some(task.id),
            Some(&task.module),
            "running",
            None,
        );
        for step in &task.steps {
            if let Err(err) = self.runner.run_step(step).await {
                return (task.id, Err(err));
            }
        }
        (task.id, Ok(()))
    }

    async fn notify(&self, batch: &SubmissionBatch, task: &Task, origin: BatchOrigin) {
        let Some(events) = &self.events else {
            return;
        };
        let event = OrchestratorEvent::TaskFinished(TaskFinishedEvent {
            job_id: batch.job_id,
            processor_id: origin.processor_id,
            site_id: origin.site_id,
            task_id: task.id,
            module: task.module.clone(),
        });
        if events.send(event).await.is_err() {
            warn!(
                job_id = batch.job_id,
                task_id = task.id,
                "Event sink closed, completion not reported"
            );
        }
    }

    pub async fn execute(&self, batch: &SubmissionBatch, origin: BatchOrigin) -> ExecutionReport {
        let limit = if batch.hints.parallelize_products {
            self.max_parallel_tasks
        } else {
            1
        };
        info!(
            job_id = batch.job_id,
            tasks = batch.tasks.len(),
            concurrency = limit,
            "🚀 Executing task batch"
        );

        let mut report = ExecutionReport {
            job_id: batch.job_id,
            ..ExecutionReport::default()
        };
        let mut pending: BTreeSet<TaskId> = batch.tasks.iter().map(|t| t.id).collect();
        let mut completed: HashSet<TaskId> = HashSet::new();
        let mut blocked: HashSet<TaskId> = HashSet::new();
        let mut running = FuturesUnordered::new();

        loop {
            // tasks below a failure never become ready
            let newly_blocked: Vec<TaskId> = batch
                .tasks
                .iter()
                .filter(|t| pending.contains(&t.id))
                .filter(|t| t.parents.iter().any(|p| blocked.contains(p)))
                .map(|t| t.id)
                .collect();
            for task_id in newly_blocked {
                pending.remove(&task_id);
                blocked.insert(task_id);
                report.skipped.push(task_id);
            }

            let ready: Vec<&Task> = batch
                .tasks
                .iter()
                .filter(|t| pending.contains(&t.id))
                .filter(|t| t.parents.iter().all(|p| completed.contains(p)))
                .collect();
            for task in ready {
                if running.len() >= limit {
                    break;
                }
                pending.remove(&task.id);
                running.push(self.run_task(task));
            }

            let Some((task_id, outcome)) = running.next().await else {
                break;
            };
            let Some(task) = batch.task(task_id) else {
                continue;
            };
            match outcome {
                Ok(()) => {
                    log_task_operation(
                        "task_finished",
                        batch.job_id,
                        Some(task_id),
                        Some(&task.module),
                        "completed",
                        None,
                    );
                    completed.insert(task_id);
                    report.completed.push(task_id);
                    self.notify(batch, task, origin).await;
                }
                Err(err) => {
                    log_task_operation(
                        "task_finished",
                        batch.job_id,
                        Some(task_id),
                        Some(&task.module),
                        "failed",
                        Some(&err.to_string()),
                    );
                    blocked.insert(task_id);
                    report.failed.push(task_id);
                }
            }
        }

        // a batch that passed validation leaves nothing pending
        report.skipped.extend(pending);

        info!(
            job_id = batch.job_id,
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Task batch finished"
        );
        report
    }
}

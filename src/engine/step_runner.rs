//! External program execution for a single step.

use crate::config::EngineConfig;
use crate::error::{OrchestratorError, Result};
use crate::orchestration::Step;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Longest stream excerpt copied into logs and errors
const OUTPUT_PREVIEW_CHARS: usize = 2000;

#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run one step to completion. A non-zero exit code is an error.
    async fn run_step(&self, step: &Step) -> Result<()>;
}

/// Runs steps as local processes inside their working directory
#[derive(Debug, Clone, Default)]
pub struct ProcessStepRunner {
    timeout: Option<Duration>,
}

impl ProcessStepRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_timeout(Duration::from_secs(config.step_timeout_seconds))
    }

    /// Kill steps running longer than `limit`; zero means no limit
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = (!limit.is_zero()).then_some(limit);
        self
    }
}

fn preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(OUTPUT_PREVIEW_CHARS)
        .collect()
}

#[async_trait]
impl StepRunner for ProcessStepRunner {
    async fn run_step(&self, step: &Step) -> Result<()> {
        tokio::fs::create_dir_all(&step.working_dir)
            .await
            .map_err(|e| OrchestratorError::io(&step.working_dir, e))?;

        let mut command = Command::new(&step.program);
        command
            .args(&step.arguments)
            .current_dir(&step.working_dir)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let started = Instant::now();
        let child = command.spawn().map_err(|e| OrchestratorError::ExternalProgram {
            program: step.program.clone(),
            reason: format!("failed to spawn: {e}"),
        })?;

        let output = match self.timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| OrchestratorError::ExternalProgram {
                    program: step.program.clone(),
                    reason: format!("timed out after {}s", limit.as_secs()),
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| OrchestratorError::ExternalProgram {
            program: step.program.clone(),
            reason: format!("failed to wait for exit: {e}"),
        })?;

        let stdout = preview(&output.stdout);
        let stderr = preview(&output.stderr);
        debug!(
            step = %step.name,
            program = %step.program,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout = %stdout,
            "Step process exited"
        );

        if output.status.success() {
            return Ok(());
        }
        warn!(step = %step.name, status = %output.status, stderr = %stderr, "Step failed");
        Err(OrchestratorError::ExternalProgram {
            program: step.program.clone(),
            reason: format!("exited with {}", output.status),
        })
    }
}

//! # Step Decorator
//!
//! Single creation point for executable steps. Every handler builds its steps
//! here so the engine always receives the same shape: resolved executable,
//! optional per-processor launcher and the task folder as working directory.

use super::types::{Step, Task};
use crate::config::ConfigurationParameterValueMap;
use crate::constants::keys::{EXECUTOR_PROCESSOR_PREFIX, LAUNCHER_SUFFIX, MODULE_PATH_PREFIX};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct StepDecorator {
    processor_short_name: String,
    configuration: ConfigurationParameterValueMap,
}

impl StepDecorator {
    pub fn new(
        processor_short_name: impl Into<String>,
        configuration: ConfigurationParameterValueMap,
    ) -> Self {
        Self {
            processor_short_name: processor_short_name.into(),
            configuration,
        }
    }

    pub fn processor_short_name(&self) -> &str {
        &self.processor_short_name
    }

    /// Executable for a logical step: `executor.module.path.<step>` or the step name
    pub fn program_for(&self, step_name: &str) -> String {
        self.configuration
            .get_non_empty(&format!("{MODULE_PATH_PREFIX}{step_name}"))
            .unwrap_or(step_name)
            .to_string()
    }

    fn launcher(&self) -> Option<&str> {
        self.configuration.get_non_empty(&format!(
            "{EXECUTOR_PROCESSOR_PREFIX}{}.{LAUNCHER_SUFFIX}",
            self.processor_short_name
        ))
    }

    /// Build the next step of `task`.
    pub fn create_step(&self, task: &Task, step_name: &str, arguments: Vec<String>) -> Step {
        let program = self.program_for(step_name);
        let (program, arguments) = match self.launcher() {
            Some(launcher) => {
                let mut wrapped = Vec::with_capacity(arguments.len() + 1);
                wrapped.push(program);
                wrapped.extend(arguments);
                (launcher.to_string(), wrapped)
            }
            None => (program, arguments),
        };

        trace!(
            job_id = task.job_id,
            task_id = task.id,
            step = %step_name,
            program = %program,
            "Step created"
        );

        Step {
            index: task.steps.len(),
            name: step_name.to_string(),
            program,
            arguments,
            working_dir: task.output_dir.clone(),
        }
    }

    /// Build a step and append it to `task`
    pub fn append_step(&self, task: &mut Task, step_name: &str, arguments: Vec<String>) {
        let step = self.create_step(task, step_name, arguments);
        task.steps.push(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn task() -> Task {
        Task {
            id: 3,
            job_id: 8,
            module: "lai-processor".to_string(),
            steps: vec![],
            parents: vec![],
            output_dir: PathBuf::from("/jobs/8-l3b/3-lai-processor"),
        }
    }

    #[test]
    fn test_program_resolution() {
        let config: ConfigurationParameterValueMap =
            [("executor.module.path.lai-processor", "/usr/bin/otbcli")]
                .into_iter()
                .collect();
        let decorator = StepDecorator::new("l3b", config);

        let mut task = task();
        decorator.append_step(&mut task, "lai-processor", vec!["-in".into(), "x.tif".into()]);
        decorator.append_step(&mut task, "quantify-image", vec![]);

        assert_eq!(task.steps[0].program, "/usr/bin/otbcli");
        assert_eq!(task.steps[0].index, 0);
        assert_eq!(task.steps[1].program, "quantify-image");
        assert_eq!(task.steps[1].index, 1);
        assert_eq!(task.steps[1].working_dir, task.output_dir);
    }

    #[test]
    fn test_launcher_wraps_program() {
        let config: ConfigurationParameterValueMap =
            [("executor.processor.l3b.launcher", "srun")].into_iter().collect();
        let decorator = StepDecorator::new("l3b", config);

        let step = decorator.create_step(&task(), "gdal_translate", vec!["a".into()]);
        assert_eq!(step.program, "srun");
        assert_eq!(step.arguments, vec!["gdal_translate", "a"]);
        assert_eq!(step.command_line(), vec!["srun", "gdal_translate", "a"]);
    }
}

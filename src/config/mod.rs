//! # Orchestrator Configuration System
//!
//! YAML-based configuration for the orchestrator process plus the per-job
//! [`ConfigurationParameterValueMap`] snapshot consumed by processor handlers.
//!
//! ## Architecture
//!
//! - **Single Source of Truth**: process settings come from `orchestrator-config.yaml`
//! - **Environment Awareness**: `development`/`test`/`production` sections override the base
//! - **Explicit Validation**: invalid settings are rejected at load time
//! - **Injected Tables**: the index descriptor catalog is configuration data, loaded once
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sen2agri_orchestrator::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let max_parallel = manager.config().engine.max_parallel_tasks;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;
pub mod parameters;

use crate::models::{ProcessorDescriptor, ProcessorId};
use crate::processors::lai::indices::IndexCatalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;
pub use parameters::{ConfigurationParameterValue, ConfigurationParameterValueMap, ParameterSource};

/// Root configuration structure mirroring orchestrator-config.yaml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Active environment, set by the loader
    #[serde(default)]
    pub environment: String,

    pub paths: PathsConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Registered processors with their default configuration parameters
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,

    /// Site-independent configuration parameters shared by every job
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Spectral and biophysical index descriptor tables
    #[serde(default)]
    pub indices: IndexCatalog,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root under which `<job_id>-<processor>` working folders are created
    pub jobs_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Upper bound on tasks executed concurrently when a job allows parallel products
    pub max_parallel_tasks: usize,
    /// Per-step timeout for external programs, 0 disables it
    pub step_timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: 4,
            step_timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorConfig {
    pub id: ProcessorId,
    pub short_name: String,
    pub name: String,
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl ProcessorConfig {
    pub fn descriptor(&self) -> ProcessorDescriptor {
        ProcessorDescriptor::new(self.id, self.short_name.clone(), self.name.clone())
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.paths.jobs_root.as_os_str().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "paths.jobs_root",
                "paths configuration",
            ));
        }

        if self.engine.max_parallel_tasks == 0 {
            return Err(ConfigurationError::invalid_value(
                "engine.max_parallel_tasks",
                "0",
                "at least one task must be allowed to run",
            ));
        }

        let mut ids = HashSet::new();
        let mut short_names = HashSet::new();
        for processor in &self.processors {
            if processor.short_name.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "short_name",
                    format!("processor {}", processor.id),
                ));
            }
            if !ids.insert(processor.id) {
                return Err(ConfigurationError::DuplicateProcessor {
                    what: "id".to_string(),
                    value: processor.id.to_string(),
                });
            }
            if !short_names.insert(processor.short_name.as_str()) {
                return Err(ConfigurationError::DuplicateProcessor {
                    what: "short name".to_string(),
                    value: processor.short_name.clone(),
                });
            }
        }

        self.indices.validate()
    }

    pub fn processor(&self, short_name: &str) -> Option<&ProcessorConfig> {
        self.processors.iter().find(|p| p.short_name == short_name)
    }

    pub fn processor_by_id(&self, id: ProcessorId) -> Option<&ProcessorConfig> {
        self.processors.iter().find(|p| p.id == id)
    }
}

//! Configuration Loader
//!
//! Finds `orchestrator-config.yaml`, overlays the section of the active
//! environment (`development`, `test` or `production`) on the base document and
//! deserializes the result into an [`OrchestratorConfig`].

use super::error::{ConfigResult, ConfigurationError};
use super::OrchestratorConfig;
use serde_yaml::{Mapping, Value as YamlValue};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const ENVIRONMENTS: [&str; 3] = ["development", "test", "production"];
const CONFIG_FILE_NAMES: [&str; 2] = ["orchestrator-config.yaml", "orchestrator-config.yml"];
const MASKED_KEY_PARTS: [&str; 4] = ["password", "secret", "token", "credential"];
const MASK: &str = "[MASKED]";

pub struct ConfigManager {
    config: OrchestratorConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load from `SEN2AGRI_CONFIG_DIR` (default `config/`) for the detected environment
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory_with_env(config_dir, &detect_environment())
    }

    /// Explicit environment, used by tests to avoid process variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(default_config_directory);
        let file = locate_config_file(&config_directory)?;
        debug!(environment, file = %file.display(), "Loading orchestrator configuration");

        let mut document = parse_document(&file)?;
        apply_environment(&mut document, environment);

        let mut config: OrchestratorConfig = serde_yaml::from_value(document).map_err(|e| {
            ConfigurationError::invalid_yaml(
                file.display().to_string(),
                format!("Failed to deserialize configuration: {e}"),
            )
        })?;
        config.environment = environment.to_string();
        config.validate()?;

        info!(
            environment,
            processors = config.processors.len(),
            parameters = config.parameters.len(),
            jobs_root = %config.paths.jobs_root.display(),
            "⚙️ Orchestrator configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON, credential-like parameters masked
    pub fn debug_config(&self) -> serde_json::Value {
        let mut value = serde_json::json!(self.config);
        mask_credentials(&mut value);
        value
    }
}

fn detect_environment() -> String {
    env::var("SEN2AGRI_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .map(|name| name.to_lowercase())
        .unwrap_or_else(|_| "development".to_string())
}

fn default_config_directory() -> PathBuf {
    env::var_os("SEN2AGRI_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config"))
}

fn locate_config_file(directory: &Path) -> ConfigResult<PathBuf> {
    let candidates: Vec<PathBuf> =
        CONFIG_FILE_NAMES.iter().map(|name| directory.join(name)).collect();
    match candidates.iter().find(|path| path.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(ConfigurationError::config_file_not_found(candidates)),
    }
}

fn parse_document(file: &Path) -> ConfigResult<YamlValue> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| ConfigurationError::file_read_error(file.display().to_string(), e))?;
    serde_yaml::from_str(&text)
        .map_err(|e| ConfigurationError::invalid_yaml(file.display().to_string(), e))
}

/// Overlay the active environment section, then drop every environment section
fn apply_environment(document: &mut YamlValue, environment: &str) {
    let YamlValue::Mapping(root) = document else {
        return;
    };
    let overlay = root.get(environment).cloned();
    for name in ENVIRONMENTS {
        root.remove(name);
    }
    if let Some(YamlValue::Mapping(section)) = overlay {
        debug!(environment, keys = section.len(), "Applying environment section");
        overlay_mapping(root, section);
    }
}

fn overlay_mapping(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        if let (Some(YamlValue::Mapping(nested)), YamlValue::Mapping(section)) =
            (base.get_mut(&key), &value)
        {
            overlay_mapping(nested, section.clone());
            continue;
        }
        base.insert(key, value);
    }
}

fn mask_credentials(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                let key = key.to_lowercase();
                if MASKED_KEY_PARTS.iter().any(|part| key.contains(part)) {
                    *entry = serde_json::Value::String(MASK.to_string());
                } else {
                    mask_credentials(entry);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(mask_credentials),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_yaml() -> &'static str {
        r#"
paths:
  jobs_root: "/mnt/archive/orchestrator_temp"

engine:
  max_parallel_tasks: 2
  step_timeout_seconds: 0

parameters:
  archiver.archive_path: "/mnt/archive/{site}/{processor}/"
  catalog.password: "hunter2"

processors:
  - id: 3
    short_name: "l3b"
    name: "LAI retrieval"
    defaults:
      processor.l3b.filter.produce_ndvi: "1"

test:
  engine:
    max_parallel_tasks: 1

production:
  paths:
    jobs_root: "/srv/orchestrator"
"#
    }

    fn write_config(content: &str) -> TempDir {
        let temp_dir = TempDir::new().expect("temp dir");
        fs::write(temp_dir.path().join("orchestrator-config.yaml"), content)
            .expect("write config");
        temp_dir
    }

    #[test]
    fn test_load_base_configuration() {
        let dir = write_config(create_test_config_yaml());
        let manager = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "development",
        )
        .expect("config should load");

        let config = manager.config();
        assert_eq!(config.environment, "development");
        assert_eq!(config.engine.max_parallel_tasks, 2);
        assert_eq!(config.processors.len(), 1);
        assert_eq!(config.processor("l3b").map(|p| p.id), Some(3));
        assert_eq!(config.indices.biophysical.len(), 3);
    }

    #[test]
    fn test_environment_overrides_are_merged() {
        let dir = write_config(create_test_config_yaml());

        let test_manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .expect("config should load");
        assert_eq!(test_manager.config().engine.max_parallel_tasks, 1);
        assert_eq!(
            test_manager.config().paths.jobs_root,
            PathBuf::from("/mnt/archive/orchestrator_temp")
        );

        let prod_manager = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "production",
        )
        .expect("config should load");
        assert_eq!(prod_manager.config().paths.jobs_root, PathBuf::from("/srv/orchestrator"));
        assert_eq!(prod_manager.config().engine.max_parallel_tasks, 2);
    }

    #[test]
    fn test_missing_file_reports_searched_paths() {
        let dir = TempDir::new().expect("temp dir");
        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        match result {
            Err(ConfigurationError::ConfigFileNotFound { searched_paths }) => {
                assert_eq!(searched_paths.len(), 2);
            }
            other => panic!("expected ConfigFileNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_processor_is_rejected() {
        let yaml = r#"
paths:
  jobs_root: "/tmp/jobs"
processors:
  - { id: 1, short_name: "l3b", name: "LAI" }
  - { id: 1, short_name: "l3a", name: "Composite" }
"#;
        let dir = write_config(yaml);
        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(matches!(result, Err(ConfigurationError::DuplicateProcessor { .. })));
    }

    #[test]
    fn test_sensitive_values_are_masked() {
        let dir = write_config(create_test_config_yaml());
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .expect("config should load");
        let debug = manager.debug_config();
        assert_eq!(debug["parameters"]["catalog.password"], "[MASKED]");
        assert_eq!(
            debug["parameters"]["archiver.archive_path"],
            "/mnt/archive/{site}/{processor}/"
        );
    }
}

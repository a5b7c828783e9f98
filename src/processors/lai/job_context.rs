//! # LAI Job Context
//!
//! Immutable per-job settings of the LAI retrieval processor, built once by
//! [`L3bJobContext::from_event`] from the submitted event, the job's
//! configuration snapshot and site metadata, then borrowed by the DAG builder.
//!
//! ## Flag resolution
//!
//! Every boolean switch is looked up as a job parameter first and as a
//! configuration key second. A parameter that is present always wins, even
//! when it disables something the configuration enables.
//!
//! | Switch | Parameter | Configuration key | Default |
//! |---|---|---|---|
//! | index production | `produce_<idx>` | `processor.l3b.filter.produce_<idx>` | on |
//! | input domain flags | `indomflags` | `processor.l3b.filter.produce_in_domain_flags` | off |
//! | parallel tiles | `parallelize_products` | `processor.l3b.filter.parallelize_products` | off |

use super::indices::{IndexCatalog, SpectralIndexDescriptor};
use crate::config::{parameters::parse_flag, ConfigurationParameterValueMap};
use crate::constants::keys::{
    COMPRESS_OUTPUT_SUFFIX, EXECUTOR_PROCESSOR_PREFIX, KEEP_JOB_FOLDERS_SUFFIX, PROCESSOR_PREFIX,
};
use crate::constants::params::{
    IN_DOMAIN_FLAGS, PARALLELIZE_PRODUCTS, PRODUCE_PREFIX, RESOLUTION, TILES_FILTER,
};
use crate::constants::DEFAULT_RESOLUTION;
use crate::error::{OrchestratorError, Result};
use crate::events::JobSubmittedEvent;
use crate::models::{JobId, SiteId};
use crate::orchestration::support::{is_cloud_optimized_geotiff, json_string_list};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Model files used by a biophysical index retrieval
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFiles {
    pub model: Option<String>,
    pub err_model: Option<String>,
}

impl ModelFiles {
    /// Both files are required; a missing one triggers the training chain
    pub fn needs_model_generation(&self) -> bool {
        self.model.is_none() || self.err_model.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiophysicalIndex {
    pub name: String,
    pub models: ModelFiles,
}

#[derive(Debug, Clone)]
pub struct L3bJobContext {
    pub job_id: JobId,
    pub site_id: SiteId,
    pub site_short_name: String,
    pub processor_short_name: String,
    pub parameters: Map<String, Value>,
    pub configuration: ConfigurationParameterValueMap,
    /// Enabled spectral indices, in catalog order
    pub spectral_indices: Vec<SpectralIndexDescriptor>,
    /// Enabled biophysical indices, in catalog order
    pub biophysical_indices: Vec<BiophysicalIndex>,
    pub generate_in_domain_flags: bool,
    pub parallelize_products: bool,
    /// Output resolution in meters
    pub resolution: u32,
    pub remove_temp_files: bool,
    pub lut_path: Option<String>,
    pub lai_bands_cfg: Option<String>,
    /// Empty means every tile is processed
    pub tiles_filter: BTreeSet<String>,
    pub cloud_optimized_geotiff: bool,
    pub compress_output: bool,
}

impl L3bJobContext {
    /// Build the context of a submitted job.
    ///
    /// `configuration` is the complete job snapshot; processor tunables are read
    /// under `processor.<short>.` and executor settings under
    /// `executor.processor.<short>.`.
    pub fn from_event(
        event: &JobSubmittedEvent,
        processor_short_name: &str,
        site_short_name: &str,
        configuration: ConfigurationParameterValueMap,
        indices: &IndexCatalog,
    ) -> Result<Self> {
        let parameters = event.parameters()?;
        let prefix = format!("{PROCESSOR_PREFIX}{processor_short_name}.");
        let filter_key = |name: &str| format!("{prefix}filter.{name}");

        let spectral_indices: Vec<SpectralIndexDescriptor> = indices
            .spectral
            .iter()
            .filter(|d| {
                param_or_config_flag(
                    &parameters,
                    &configuration,
                    &format!("{PRODUCE_PREFIX}{}", d.name),
                    &filter_key(&format!("{PRODUCE_PREFIX}{}", d.name)),
                    true,
                )
            })
            .cloned()
            .collect();

        let biophysical_indices: Vec<BiophysicalIndex> = indices
            .biophysical
            .iter()
            .filter(|name| {
                param_or_config_flag(
                    &parameters,
                    &configuration,
                    &format!("{PRODUCE_PREFIX}{name}"),
                    &filter_key(&format!("{PRODUCE_PREFIX}{name}")),
                    true,
                )
            })
            .map(|name| BiophysicalIndex {
                name: name.clone(),
                models: ModelFiles {
                    model: non_empty(&configuration, &format!("{prefix}{name}.model")),
                    err_model: non_empty(&configuration, &format!("{prefix}{name}.err_model")),
                },
            })
            .collect();

        let generate_in_domain_flags = param_or_config_flag(
            &parameters,
            &configuration,
            IN_DOMAIN_FLAGS,
            &filter_key("produce_in_domain_flags"),
            false,
        );
        let parallelize_products = param_or_config_flag(
            &parameters,
            &configuration,
            PARALLELIZE_PRODUCTS,
            &filter_key(PARALLELIZE_PRODUCTS),
            false,
        );

        let resolution = resolution(&parameters);
        let keep_job_folders = configuration.flag_or(
            &format!("{EXECUTOR_PROCESSOR_PREFIX}{processor_short_name}.{KEEP_JOB_FOLDERS_SUFFIX}"),
            false,
        );

        let lai_bands_cfg = non_empty(&configuration, &format!("{prefix}lai.laibandscfgfile"));
        if !biophysical_indices.is_empty() && lai_bands_cfg.is_none() {
            return Err(OrchestratorError::missing_configuration(
                format!("{prefix}lai.laibandscfgfile"),
                "biophysical indices require a bands configuration file",
            ));
        }

        let mut tiles_filter: BTreeSet<String> =
            json_string_list(parameters.get(TILES_FILTER)).into_iter().collect();
        if tiles_filter.is_empty() {
            tiles_filter = json_string_list(
                configuration
                    .get_non_empty(&format!("{prefix}{TILES_FILTER}"))
                    .map(|s| Value::String(s.to_string()))
                    .as_ref(),
            )
            .into_iter()
            .collect();
        }

        let context = Self {
            job_id: event.job_id,
            site_id: event.site_id,
            site_short_name: site_short_name.to_string(),
            processor_short_name: processor_short_name.to_string(),
            cloud_optimized_geotiff: is_cloud_optimized_geotiff(
                &configuration,
                processor_short_name,
            ),
            compress_output: configuration
                .flag_or(&format!("{prefix}{COMPRESS_OUTPUT_SUFFIX}"), false),
            lut_path: non_empty(&configuration, &format!("{prefix}lai.lut_path")),
            parameters,
            configuration,
            spectral_indices,
            biophysical_indices,
            generate_in_domain_flags,
            parallelize_products,
            resolution,
            remove_temp_files: !keep_job_folders,
            lai_bands_cfg,
            tiles_filter,
        };

        debug!(
            job_id = context.job_id,
            spectral = context.spectral_indices.len(),
            biophysical = context.biophysical_indices.len(),
            in_domain_flags = context.generate_in_domain_flags,
            parallelize_products = context.parallelize_products,
            resolution = context.resolution,
            "LAI job context built"
        );
        Ok(context)
    }

    pub fn has_biophysical_index(&self) -> bool {
        !self.biophysical_indices.is_empty()
    }

    /// Whether any biophysical index still lacks a model
    pub fn needs_model_generation(&self) -> bool {
        self.biophysical_indices
            .iter()
            .any(|bi| bi.models.needs_model_generation())
    }

    pub fn accepts_tile(&self, tile_id: &str) -> bool {
        self.tiles_filter.is_empty() || self.tiles_filter.contains(tile_id)
    }

    pub fn resolution_string(&self) -> String {
        self.resolution.to_string()
    }
}

fn non_empty(configuration: &ConfigurationParameterValueMap, key: &str) -> Option<String> {
    configuration.get_non_empty(key).map(str::to_string)
}

/// A present job parameter wins over the configuration key, which wins over `default`
fn param_or_config_flag(
    parameters: &Map<String, Value>,
    configuration: &ConfigurationParameterValueMap,
    param_name: &str,
    config_key: &str,
    default: bool,
) -> bool {
    if let Some(value) = parameters.get(param_name) {
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            Value::String(s) => parse_flag(s),
            _ => None,
        };
        match parsed {
            Some(flag) => return flag,
            None => warn!(
                parameter = %param_name,
                value = %value,
                "Ignoring unreadable flag parameter"
            ),
        }
    }
    configuration.flag(config_key).unwrap_or(default)
}

fn resolution(parameters: &Map<String, Value>) -> u32 {
    let parsed = match parameters.get(RESOLUTION) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .filter(|r| *r > 0)
        .and_then(|r| u32::try_from(r).ok())
        .unwrap_or(DEFAULT_RESOLUTION)
}

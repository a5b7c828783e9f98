//! # Shared Handler Utilities
//!
//! Helpers every processor handler relies on: final product folder templating,
//! job folder retention, recovery of the formatter's sidecar outputs and
//! resolution of a job's input products.

use super::sidecar;
use crate::catalog::CatalogGateway;
use crate::config::ConfigurationParameterValueMap;
use crate::constants::keys::{
    CLOUD_OPTIMIZED_GEOTIFF_SUFFIX, EXECUTOR_PROCESSOR_PREFIX, KEEP_JOB_FOLDERS_SUFFIX,
    PROCESSOR_PREFIX, PRODUCTS_LOCATION,
};
use crate::constants::params::{
    END_DATE, INPUT_PREFIX, INPUT_PRODUCTS, SCHEDULED_DATE_FORMAT, START_DATE,
};
use crate::constants::sidecar::{OUTPUT_PROPERTIES_FILE, PARENT_PRODUCT_IDS_FILE};
use crate::constants::TILE_PREFIX;
use crate::context::ExecutionContext;
use crate::error::{OrchestratorError, Result};
use crate::events::TaskFinishedEvent;
use crate::models::{JobId, Product, ProductId, ProductType, SiteId};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Folder receiving the final product, from the `{site}`/`{processor}` template.
///
/// A missing template is a data error: there is no default location.
pub fn final_product_folder(
    ctx: &dyn ExecutionContext,
    job_id: JobId,
    site_id: SiteId,
    processor_short_name: &str,
) -> Result<PathBuf> {
    let cfg = ctx.job_configuration(job_id, PRODUCTS_LOCATION)?;
    let site_short_name = ctx.catalog().site_short_name(site_id)?;

    let template = cfg.get_non_empty(PRODUCTS_LOCATION).ok_or_else(|| {
        OrchestratorError::missing_configuration(
            PRODUCTS_LOCATION,
            format!(
                "No final product folder configured for site {site_short_name} \
                 and processor {processor_short_name}"
            ),
        )
    })?;

    Ok(PathBuf::from(
        template
            .replace("{site}", &site_short_name)
            .replace("{processor}", processor_short_name),
    ))
}

fn keep_job_folders_key(processor_short_name: &str) -> String {
    format!("{EXECUTOR_PROCESSOR_PREFIX}{processor_short_name}.{KEEP_JOB_FOLDERS_SUFFIX}")
}

/// Whether the job working folder should be deleted once the job is done.
/// Folders are removed unless `keep_job_folders` is set for the processor.
pub fn needs_job_folder_removal(
    ctx: &dyn ExecutionContext,
    job_id: JobId,
    processor_short_name: &str,
) -> Result<bool> {
    let key = keep_job_folders_key(processor_short_name);
    let cfg = ctx.job_configuration(job_id, &key)?;
    Ok(!cfg.flag_or(&key, false))
}

/// Recursively delete the job working folder. Failures are logged, not raised.
pub fn remove_job_folder(
    ctx: &dyn ExecutionContext,
    job_id: JobId,
    processor_short_name: &str,
) -> bool {
    let folder = ctx.job_output_path(job_id, processor_short_name);
    match std::fs::remove_dir_all(&folder) {
        Ok(()) => {
            info!(job_id, folder = %folder.display(), "Job folder removed");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!(job_id, folder = %folder.display(), error = %e, "Unable to remove job folder");
            false
        }
    }
}

/// Output folder of the task a completion event refers to
pub fn finished_task_output_path(
    ctx: &dyn ExecutionContext,
    event: &TaskFinishedEvent,
    processor_short_name: &str,
) -> PathBuf {
    ctx.task_output_path(event.job_id, processor_short_name, event.task_id, &event.module)
}

/// Product path the formatter wrote into its task folder, if any
pub fn output_product_path(task_output_dir: &Path) -> Option<String> {
    sidecar::read_product_path(&task_output_dir.join(OUTPUT_PROPERTIES_FILE))
}

pub fn output_product_name(product_path: &str) -> Option<String> {
    Path::new(product_path.trim_end_matches('/'))
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Parent product ids recorded next to the formatter task
pub fn output_product_parent_ids(task_output_dir: &Path) -> Vec<ProductId> {
    sidecar::read_parent_product_ids(&task_output_dir.join(PARENT_PRODUCT_IDS_FILE))
}

pub fn write_output_product_parent_ids(task_output_dir: &Path, ids: &[ProductId]) -> Result<()> {
    sidecar::write_parent_product_ids(&task_output_dir.join(PARENT_PRODUCT_IDS_FILE), ids)
}

/// `TILE_<id>` separator used on formatter command lines
pub fn tile_token(tile_id: &str) -> String {
    format!("{TILE_PREFIX}{tile_id}")
}

/// Cloud-optimized GeoTIFF output flag of a processor. The family is the first
/// `_`-separated token of the short name, e.g. `l3b` for `l3b_lai`.
pub fn is_cloud_optimized_geotiff(
    cfg: &ConfigurationParameterValueMap,
    processor_short_name: &str,
) -> bool {
    let family = processor_short_name
        .split('_')
        .next()
        .unwrap_or(processor_short_name);
    cfg.flag_or(
        &format!("{PROCESSOR_PREFIX}{family}.{CLOUD_OPTIMIZED_GEOTIFF_SUFFIX}"),
        false,
    )
}

/// Strings held by a parameter that is either a JSON array or a single string
pub fn json_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split([',', ' ', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Explicit input product names: `input_<type>` first, then the generic
/// `input_products` list restricted to names of the requested type
pub fn input_product_names(params: &Map<String, Value>, product_type: ProductType) -> Vec<String> {
    let typed =
        json_string_list(params.get(&format!("{INPUT_PREFIX}{}", product_type.short_name())));
    if !typed.is_empty() {
        return typed;
    }
    json_string_list(params.get(INPUT_PRODUCTS))
        .into_iter()
        .filter(|name| ProductType::from_product_name(name) == Some(product_type))
        .collect()
}

/// Products a job works on and the time span they cover
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputProducts {
    pub products: Vec<Product>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl InputProducts {
    fn widen(&mut self, date: NaiveDateTime) {
        self.start = Some(self.start.map_or(date, |s| s.min(date)));
        self.end = Some(self.end.map_or(date, |e| e.max(date)));
    }
}

fn parse_param_date(params: &Map<String, Value>, name: &str) -> Result<Option<NaiveDate>> {
    let Some(value) = params.get(name) else {
        return Ok(None);
    };
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    NaiveDate::parse_from_str(&raw, SCHEDULED_DATE_FORMAT)
        .map(Some)
        .map_err(|e| OrchestratorError::invalid_parameter(name, raw, e.to_string()))
}

/// Resolve a job's input products from explicit names or from the
/// `start_date`/`end_date` interval (`yyyyMMdd`, end day inclusive).
///
/// An explicit name missing from the catalog yields no products at all.
pub fn input_products(
    catalog: &dyn CatalogGateway,
    site_id: SiteId,
    params: &Map<String, Value>,
    product_type: ProductType,
) -> Result<InputProducts> {
    let mut inputs = InputProducts::default();
    let names = input_product_names(params, product_type);

    if !names.is_empty() {
        let found = catalog.products_by_names(site_id, &names)?;
        for name in &names {
            match found.iter().find(|p| &p.name == name) {
                Some(product) => {
                    inputs.widen(product.created);
                    inputs.products.push(product.clone());
                }
                None => {
                    error!(site_id, product = %name, "Input product not found in catalog");
                    return Ok(InputProducts::default());
                }
            }
        }
        return Ok(inputs);
    }

    let start = parse_param_date(params, START_DATE)?;
    let end = parse_param_date(params, END_DATE)?;
    if let (Some(start), Some(end)) = (start, end) {
        let start = start.and_time(NaiveTime::MIN);
        let end = end
            .and_hms_opt(23, 59, 59)
            .unwrap_or_else(|| end.and_time(NaiveTime::MIN));
        inputs.products = catalog.products(site_id, product_type, start, end)?;
        inputs.start = Some(start);
        inputs.end = Some(end);
    }

    debug!(
        site_id,
        product_type = %product_type,
        count = inputs.products.len(),
        "Input products resolved"
    );
    Ok(inputs)
}

//! # LAI Retrieval Processor
//!
//! Handler producing mono-date vegetation status products (L3B) from L2A
//! inputs: spectral indices plus model-based biophysical indices, tile by tile.
//!
//! ## Flow
//!
//! 1. **Job submitted**: build the [`L3bJobContext`], resolve L2A inputs, drop
//!    filtered tiles, build the task graph, write the formatter sidecars and
//!    submit the batch.
//! 2. **Formatter finished**: read back the product path, register the product
//!    with its provenance, finish the job and clean up its folder.
//! 3. **Processing definition**: resolve the site season for the scheduled date
//!    and list the L2A products not yet turned into an L3B product.

pub mod args;
pub mod dag;
pub mod indices;
pub mod job_context;
pub mod manifest;
pub mod tile_files;

pub use dag::{select_tiles, LaiDag, LaiDagBuilder};
pub use indices::{IndexCatalog, SpectralIndexDescriptor};
pub use job_context::L3bJobContext;
pub use tile_files::{TileInfos, TileResultFiles};

use crate::config::ConfigurationParameterValueMap;
use crate::constants::params::{END_DATE, INPUT_PRODUCTS, SCHEDULED_DATE_FORMAT, START_DATE};
use crate::context::{ExecutionContext, SchedulingContext};
use crate::error::{ErrorCategory, OrchestratorError, Result};
use crate::events::{JobSubmittedEvent, TaskFinishedEvent};
use crate::logging::{log_job_operation, log_task_operation};
use crate::models::{NewProduct, ProcessorDescriptor, ProductType, SiteId};
use crate::orchestration::handler::{ProcessorHandler, ProcessorJobDefinitionParams};
use crate::orchestration::product_output::{product_footprint, product_quicklook};
use crate::orchestration::{support, StepDecorator};
use crate::provenance::{self, ProvenanceQuery};
use crate::season::{resolve_season, SeasonPolicy};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct LaiRetrievalHandler {
    descriptor: ProcessorDescriptor,
    indices: Arc<IndexCatalog>,
    season_policy: SeasonPolicy,
}

impl LaiRetrievalHandler {
    pub fn new(descriptor: ProcessorDescriptor, indices: Arc<IndexCatalog>) -> Self {
        Self {
            descriptor,
            indices,
            season_policy: SeasonPolicy::StartEndDates,
        }
    }

    /// Season policy used by processing definitions
    pub fn with_season_policy(mut self, policy: SeasonPolicy) -> Self {
        self.season_policy = policy;
        self
    }

    fn short_name(&self) -> &str {
        &self.descriptor.short_name
    }

    fn finish_product(&self, ctx: &dyn ExecutionContext, event: &TaskFinishedEvent) -> Result<()> {
        let short_name = self.short_name();
        let task_dir = support::finished_task_output_path(ctx, event, short_name);

        let Some(product_path) = support::output_product_path(&task_dir) else {
            let err = OrchestratorError::ProductNotFound {
                reference: format!(
                    "formatter output of job {} task {}",
                    event.job_id, event.task_id
                ),
            };
            ctx.mark_job_failed(event.job_id, &err.to_string())?;
            return Err(err);
        };

        let name =
            support::output_product_name(&product_path).unwrap_or_else(|| product_path.clone());
        let parent_product_ids = support::output_product_parent_ids(&task_dir);
        let parents = ctx.catalog().products_by_ids(&parent_product_ids)?;
        let tiles: BTreeSet<String> =
            parents.iter().flat_map(|p| p.tiles.iter().cloned()).collect();

        let folder = Path::new(&product_path);
        let quicklook = product_quicklook(folder)
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let product_id = ctx.catalog().insert_product(NewProduct {
            product_type: ProductType::L3b,
            processor_id: event.processor_id,
            site_id: event.site_id,
            job_id: event.job_id,
            full_path: product_path.clone(),
            name,
            created: Utc::now().naive_utc(),
            quicklook,
            footprint: product_footprint(folder),
            tiles: tiles.into_iter().collect(),
            parent_product_ids,
        })?;
        info!(job_id = event.job_id, product_id, path = %product_path, "📦 Product registered");

        ctx.mark_job_finished(event.job_id)?;
        if support::needs_job_folder_removal(ctx, event.job_id, short_name)? {
            support::remove_job_folder(ctx, event.job_id, short_name);
        }
        Ok(())
    }
}

impl ProcessorHandler for LaiRetrievalHandler {
    fn descriptor(&self) -> &ProcessorDescriptor {
        &self.descriptor
    }

    #[instrument(skip_all, fields(job_id = event.job_id, site_id = event.site_id))]
    fn handle_job_submitted(
        &self,
        ctx: &dyn ExecutionContext,
        event: &JobSubmittedEvent,
    ) -> Result<()> {
        let short_name = self.short_name();
        let configuration = ctx.job_configuration(event.job_id, "")?;
        let site_short_name = ctx.catalog().site_short_name(event.site_id)?;
        let job_ctx = L3bJobContext::from_event(
            event,
            short_name,
            &site_short_name,
            configuration.clone(),
            &self.indices,
        )?;

        let inputs = support::input_products(
            ctx.catalog(),
            event.site_id,
            &job_ctx.parameters,
            ProductType::L2a,
        )?;
        let explicit =
            !support::input_product_names(&job_ctx.parameters, ProductType::L2a).is_empty();
        let products = match (explicit, inputs.start, inputs.end) {
            (false, Some(start), Some(end)) => {
                let query = ProvenanceQuery::new(
                    event.site_id,
                    [ProductType::L2a],
                    ProductType::L3b,
                    start,
                    end,
                );
                let processed = provenance::processed_sources(ctx.catalog(), &query)?;
                provenance::filter_unprocessed(inputs.products, &processed)
            }
            _ => inputs.products,
        };
        if products.is_empty() {
            return Err(OrchestratorError::NoInputProducts {
                job_id: event.job_id,
                reason: "no L2A product to process".to_string(),
            });
        }

        let tiles = select_tiles(&job_ctx, &products);
        let final_folder =
            support::final_product_folder(ctx, event.job_id, event.site_id, short_name)?;
        let dag = LaiDagBuilder::new(
            &job_ctx,
            ctx.job_output_path(event.job_id, short_name),
            StepDecorator::new(short_name, configuration),
        )
        .build(&tiles, &final_folder)?;

        dag.write_sidecars()?;
        let task_count = dag.batch.tasks.len();
        ctx.submit_tasks(dag.batch)?;

        log_job_operation(
            "lai_job_submitted",
            event.job_id,
            Some(short_name),
            Some(event.site_id),
            "submitted",
            Some(&format!("{} tiles, {task_count} tasks", tiles.len())),
        );
        Ok(())
    }

    fn handle_task_finished(
        &self,
        ctx: &dyn ExecutionContext,
        event: &TaskFinishedEvent,
    ) -> Result<()> {
        log_task_operation(
            "task_finished",
            event.job_id,
            Some(event.task_id),
            Some(&event.module),
            "completed",
            None,
        );
        if event.module != args::modules::PRODUCT_FORMATTER {
            return Ok(());
        }
        self.finish_product(ctx, event)
    }

    fn processing_definition(
        &self,
        ctx: &dyn SchedulingContext,
        site_id: SiteId,
        scheduled_date: NaiveDate,
        request_overrides: &ConfigurationParameterValueMap,
    ) -> Result<ProcessorJobDefinitionParams> {
        let active = ctx.catalog().active_job_ids(self.descriptor.id, site_id)?;
        if !active.is_empty() {
            info!(
                site_id,
                active_jobs = ?active,
                "Processor already running on site, nothing to schedule"
            );
            return Ok(ProcessorJobDefinitionParams::invalid());
        }

        let seasons = ctx.catalog().site_seasons(site_id)?;
        let window = match resolve_season(
            site_id,
            &seasons,
            scheduled_date,
            request_overrides,
            self.season_policy,
        ) {
            Ok(window) => window,
            Err(err) if err.category() == ErrorCategory::Data => {
                warn!(site_id, %scheduled_date, error = %err, "No season to schedule against");
                return Ok(ProcessorJobDefinitionParams::invalid());
            }
            Err(err) => return Err(err),
        };

        let start = window.start.and_time(NaiveTime::MIN);
        let end = scheduled_date
            .and_hms_opt(23, 59, 59)
            .unwrap_or_else(|| scheduled_date.and_time(NaiveTime::MIN));
        let query = ProvenanceQuery::new(site_id, [ProductType::L2a], ProductType::L3b, start, end);
        let products = provenance::unprocessed_sources(ctx.catalog(), &query)?;
        debug!(
            site_id,
            season_id = window.season_id,
            products = products.len(),
            "L2A products awaiting L3B"
        );

        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        Ok(ProcessorJobDefinitionParams {
            is_valid: !products.is_empty(),
            json_parameters: json!({
                INPUT_PRODUCTS: names,
                START_DATE: window.start.format(SCHEDULED_DATE_FORMAT).to_string(),
                END_DATE: scheduled_date.format(SCHEDULED_DATE_FORMAT).to_string(),
            }),
            product_list: products,
        })
    }
}

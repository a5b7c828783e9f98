//! # LAI Task Graph Builder
//!
//! Expands an LAI retrieval job into its task graph. Every tile gets an
//! independent chain and all chains meet in one product-formatter task:
//!
//! ```text
//! per tile:   [models] ─┐
//!             [angles] ─┼─> <bi> retrieval ─> [<bi> domain flags]
//!             mask ─────┤
//!                       └─> <spectral index>
//!
//! job:        leaves of every tile ─> product formatter
//! ```
//!
//! Bracketed tasks are optional: models only when a biophysical index lacks a
//! model, angles only when the product carries no angles raster, domain flags
//! only when domain flag production is enabled.
//!
//! Unless the job folders are kept, the formatter task ends with a step
//! removing the intermediate rasters of every tile.

use super::args::{self, modules, steps, RetrievalArgs};
use super::job_context::L3bJobContext;
use super::manifest::ExecutionInfos;
use super::tile_files::{TileInfos, TileResultFiles};
use crate::constants::params::SCHEDULED_DATE_FORMAT;
use crate::constants::sidecar::{EXECUTION_INFOS_FILE, OUTPUT_PROPERTIES_FILE};
use crate::error::{OrchestratorError, Result};
use crate::formatter::vegetation::{
    self, biophysical_error_key, biophysical_key, domain_flags_key, IN_DOMAIN_FLAGS_KEY,
    STATUS_FLAGS_KEY, VEGETATION_OUTPUTS,
};
use crate::models::{Product, ProductId, TaskId};
use crate::orchestration::support::{tile_token, write_output_product_parent_ids};
use crate::orchestration::{ExecutionHints, StepDecorator, SubmissionBatch, TaskGraph};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Built task graph of one LAI job with the files the formatter will read
#[derive(Debug, Clone)]
pub struct LaiDag {
    pub batch: SubmissionBatch,
    pub formatter_task_id: TaskId,
    pub formatter_dir: PathBuf,
    pub manifest: ExecutionInfos,
    pub parent_product_ids: Vec<ProductId>,
}

impl LaiDag {
    pub fn manifest_path(&self) -> PathBuf {
        self.formatter_dir.join(EXECUTION_INFOS_FILE)
    }

    /// Write the manifest and the parent-product-ids sidecar next to the
    /// formatter task. Must happen before the batch is submitted.
    pub fn write_sidecars(&self) -> Result<()> {
        self.manifest.write(&self.manifest_path())?;
        write_output_product_parent_ids(&self.formatter_dir, &self.parent_product_ids)
    }
}

/// Tiles of the input products that pass the job's tile filter, in input order.
/// Excluded tiles never reach the builder.
pub fn select_tiles(ctx: &L3bJobContext, products: &[Product]) -> Vec<TileInfos> {
    let mut seen = BTreeSet::new();
    products
        .iter()
        .filter_map(TileInfos::from_product)
        .filter(|tile| {
            let accepted = ctx.accepts_tile(&tile.tile_id);
            if !accepted {
                debug!(job_id = ctx.job_id, tile = %tile.tile_id, "Tile excluded by filter");
            }
            accepted
        })
        .filter(|tile| seen.insert((tile.tile_id.clone(), tile.parent_product_id())))
        .collect()
}

pub struct LaiDagBuilder<'a> {
    ctx: &'a L3bJobContext,
    graph: TaskGraph,
}

impl<'a> LaiDagBuilder<'a> {
    pub fn new(
        ctx: &'a L3bJobContext,
        job_output_dir: impl Into<PathBuf>,
        decorator: StepDecorator,
    ) -> Self {
        Self {
            ctx,
            graph: TaskGraph::new(ctx.job_id, job_output_dir, decorator),
        }
    }

    pub fn build(mut self, tiles: &[TileInfos], final_product_folder: &Path) -> Result<LaiDag> {
        if tiles.is_empty() {
            return Err(OrchestratorError::NoInputProducts {
                job_id: self.ctx.job_id,
                reason: "no tile left to process".to_string(),
            });
        }

        let mut results = Vec::with_capacity(tiles.len());
        for tile in tiles {
            results.push(self.add_tile(tile)?);
        }

        let leaves = self.graph.leaves();
        let formatter_task_id = self.graph.add_task(modules::PRODUCT_FORMATTER, &leaves)?;
        let formatter_dir = self.task_dir(formatter_task_id)?;

        let manifest = ExecutionInfos {
            job_id: self.ctx.job_id,
            resolution: self.ctx.resolution,
            tiles: results,
        };
        let formatter_args =
            self.formatter_args(tiles, &manifest.tiles, &formatter_dir, final_product_folder);
        self.graph
            .add_step(formatter_task_id, steps::PRODUCT_FORMATTER, formatter_args)?;

        let temporary_files: Vec<String> = manifest
            .tiles
            .iter()
            .flat_map(|files| files.temporary_files.iter().cloned())
            .collect();
        if self.ctx.remove_temp_files && !temporary_files.is_empty() {
            self.graph.add_step(
                formatter_task_id,
                steps::FILES_REMOVER,
                args::files_remover_args(&temporary_files),
            )?;
        }

        let mut parent_product_ids: Vec<ProductId> = Vec::new();
        for tile in tiles {
            if !parent_product_ids.contains(&tile.parent_product_id()) {
                parent_product_ids.push(tile.parent_product_id());
            }
        }

        let batch = self.graph.into_batch(ExecutionHints {
            parallelize_products: self.ctx.parallelize_products,
        });
        info!(
            job_id = batch.job_id,
            tiles = tiles.len(),
            tasks = batch.tasks.len(),
            steps = batch.step_count(),
            "LAI task graph built"
        );

        Ok(LaiDag {
            batch,
            formatter_task_id,
            formatter_dir,
            manifest,
            parent_product_ids,
        })
    }

    fn task_dir(&self, task_id: TaskId) -> Result<PathBuf> {
        self.graph
            .task(task_id)
            .map(|t| t.output_dir.clone())
            .ok_or(OrchestratorError::UnknownTask { task_id })
    }

    fn add_tile(&mut self, tile: &TileInfos) -> Result<TileResultFiles> {
        let ctx = self.ctx;
        let tile_id = tile.tile_id.as_str();
        let resolution = ctx.resolution_string();
        let bands_cfg = ctx.lai_bands_cfg.clone().unwrap_or_default();
        let mut files = TileResultFiles::new(tile);

        let mut training_task = None;
        let mut generated_models: BTreeMap<String, (String, String)> = BTreeMap::new();
        let needing_models: Vec<_> = ctx
            .biophysical_indices
            .iter()
            .filter(|bi| bi.models.needs_model_generation())
            .collect();
        if !needing_models.is_empty() {
            let task_id = self.graph.add_task(modules::MODELS, &[])?;
            let dir = self.task_dir(task_id)?;
            for bi in needing_models {
                let model =
                    file_in(&dir, &format!("{tile_id}_{}_MODEL.txt", bi.name.to_uppercase()));
                let err_model =
                    file_in(&dir, &format!("{tile_id}_{}_ERR_MODEL.txt", bi.name.to_uppercase()));
                self.graph.add_step(
                    task_id,
                    steps::MODEL_LEARNING,
                    args::model_learning_args(
                        &tile.tile_file,
                        &bands_cfg,
                        &bi.name,
                        &model,
                        &err_model,
                    ),
                )?;
                generated_models.insert(bi.name.clone(), (model, err_model));
            }
            training_task = Some(task_id);
        }

        let mut angles_task = None;
        if ctx.has_biophysical_index() && files.needs_angles() {
            let task_id = self.graph.add_task(modules::ANGLES, &[])?;
            let dir = self.task_dir(task_id)?;
            let angles = file_in(&dir, &format!("{tile_id}_ANGLES.tif"));
            let no_data = file_in(&dir, &format!("{tile_id}_ANGLES_NODATA.tif"));
            let vrt = file_in(&dir, &format!("{tile_id}_ANGLES.vrt"));
            let resampled = file_in(&dir, &format!("{tile_id}_ANGLES_RESAMPLED.tif"));

            self.graph.add_step(
                task_id,
                steps::CREATE_ANGLES,
                args::create_angles_args(&tile.tile_file, &angles),
            )?;
            self.graph.add_step(
                task_id,
                steps::GDAL_TRANSLATE,
                args::angles_no_data_args(&angles, &no_data),
            )?;
            self.graph
                .add_step(task_id, steps::GDAL_BUILD_VRT, args::angles_vrt_args(&no_data, &vrt))?;
            self.graph.add_step(
                task_id,
                steps::GDAL_TRANSLATE,
                args::resample_angles_args(&vrt, &resampled, &resolution),
            )?;
            files.temporary_files.extend([angles, no_data, vrt]);
            files.angles_file = Some(resampled);
            angles_task = Some(task_id);
        }

        let mask_task = self.graph.add_task(modules::STATUS_FLAGS, &[])?;
        let mask_dir = self.task_dir(mask_task)?;
        files.status_flags_file = file_in(&mask_dir, &format!("{tile_id}_STATUS_FLAGS.tif"));
        files.status_flags_file_resampled =
            file_in(&mask_dir, &format!("{tile_id}_STATUS_FLAGS_RESAMPLED.tif"));
        self.graph.add_step(
            mask_task,
            steps::MONO_DATE_MASK_FLAGS,
            args::mono_date_mask_flags_args(
                &tile.tile_file,
                tile.external_mask.as_deref(),
                &files.status_flags_file,
                &files.status_flags_file_resampled,
                &resolution,
            ),
        )?;
        files
            .temporary_files
            .push(files.status_flags_file_resampled.clone());
        if ctx.generate_in_domain_flags && ctx.has_biophysical_index() {
            let in_domain = file_in(&mask_dir, &format!("{tile_id}_IN_DOMAIN_FLAGS.tif"));
            self.graph.add_step(
                mask_task,
                steps::IN_DOMAIN_FLAGS,
                args::input_domain_flags_args(&tile.tile_file, &bands_cfg, &in_domain, &resolution),
            )?;
            files.in_domain_flags_file = Some(in_domain);
        }

        for index in &ctx.spectral_indices {
            let task_id = self.graph.add_task(modules::SPECTRAL_INDEX, &[mask_task])?;
            let dir = self.task_dir(task_id)?;
            let index_file = file_in(&dir, &format!("{tile_id}_{}.tif", index.name.to_uppercase()));
            self.graph.add_step(
                task_id,
                steps::SPECTRAL_INDEX_EXTRACTION,
                args::spectral_index_args(
                    &tile.tile_file,
                    &index.index_type,
                    &files.status_flags_file,
                    &index_file,
                ),
            )?;
            self.add_optimize_step(task_id, &index.param_name, &index_file)?;
            files.index_files.insert(index.name.clone(), index_file);
        }

        for bi in &ctx.biophysical_indices {
            let mut parents = vec![mask_task];
            parents.extend(angles_task);
            parents.extend(training_task);

            let task_id = self.graph.add_task(modules::BIOPHYSICAL_INDEX, &parents)?;
            let dir = self.task_dir(task_id)?;
            let name = bi.name.to_uppercase();
            let raw = file_in(&dir, &format!("{tile_id}_{name}_MONO_DATE.tif"));
            let err = file_in(&dir, &format!("{tile_id}_{name}_MONO_DATE_ERR.tif"));
            let quantified = file_in(&dir, &format!("{tile_id}_{name}_MONO_DATE_QUANT.tif"));

            let (model, err_model) = match generated_models.get(&bi.name) {
                Some((model, err_model)) => (model.clone(), err_model.clone()),
                None => (
                    bi.models.model.clone().unwrap_or_default(),
                    bi.models.err_model.clone().unwrap_or_default(),
                ),
            };
            let angles = files.angles_file.clone().unwrap_or_default();

            self.graph.add_step(
                task_id,
                steps::LAI_PROCESSOR,
                args::lai_processor_args(&RetrievalArgs {
                    xml_file: &tile.tile_file,
                    angles_file: &angles,
                    resolution: &resolution,
                    bands_cfg: &bands_cfg,
                    index_name: &bi.name,
                    model: &model,
                    err_model: &err_model,
                    out_file: &raw,
                    out_err_file: &err,
                }),
            )?;
            self.graph.add_step(
                task_id,
                steps::QUANTIFY_IMAGE,
                args::quantify_image_args(&raw, &quantified),
            )?;
            self.add_optimize_step(task_id, &biophysical_key(&bi.name), &quantified)?;
            files.index_files.insert(bi.name.clone(), quantified.clone());
            files.error_files.insert(bi.name.clone(), err);
            files.temporary_files.push(raw);

            if ctx.generate_in_domain_flags {
                let domain_task = self.graph.add_task(modules::DOMAIN_FLAGS, &[task_id])?;
                let dir = self.task_dir(domain_task)?;
                let flags = file_in(&dir, &format!("{tile_id}_{name}_DOMAIN_FLAGS.tif"));
                let corrected = file_in(&dir, &format!("{tile_id}_{name}_CORRECTED.tif"));
                self.graph.add_step(
                    domain_task,
                    steps::OUT_DOMAIN_FLAGS,
                    args::output_domain_flags_args(
                        &tile.tile_file,
                        &quantified,
                        &bands_cfg,
                        &bi.name,
                        &flags,
                        &corrected,
                        &resolution,
                    ),
                )?;
                files.domain_flags_files.insert(bi.name.clone(), flags);
                files.temporary_files.push(corrected);
            }
        }

        debug!(job_id = ctx.job_id, tile = %tile_id, tasks = self.graph.len(), "Tile chain built");
        Ok(files)
    }

    fn add_optimize_step(&mut self, task_id: TaskId, layer_key: &str, raster: &str) -> Result<()> {
        let Some(output) = vegetation::vegetation_output(layer_key) else {
            return Ok(());
        };
        match vegetation::optimize_gtiff_args(
            raster,
            &output.treatment(),
            self.ctx.cloud_optimized_geotiff,
            self.ctx.compress_output,
        ) {
            Some(arguments) => self.graph.add_step(task_id, steps::OPTIMIZE_GTIFF, arguments),
            None => Ok(()),
        }
    }

    fn formatter_args(
        &self,
        tiles: &[TileInfos],
        results: &[TileResultFiles],
        formatter_dir: &Path,
        final_product_folder: &Path,
    ) -> Vec<String> {
        let ctx = self.ctx;
        let flag = |enabled: bool| if enabled { "1" } else { "0" };
        let mut arguments: Vec<String> = vec![
            "-destroot".to_string(),
            final_product_folder.display().to_string(),
            "-fileclass".to_string(),
            "OPER".to_string(),
            "-level".to_string(),
            "L3B".to_string(),
            "-baseline".to_string(),
            "01.00".to_string(),
            "-siteid".to_string(),
            ctx.site_short_name.clone(),
            "-processor".to_string(),
            "vegetation".to_string(),
            "-outprops".to_string(),
            file_in(formatter_dir, OUTPUT_PROPERTIES_FILE),
            "-execinfos".to_string(),
            file_in(formatter_dir, EXECUTION_INFOS_FILE),
            "-cog".to_string(),
            flag(ctx.cloud_optimized_geotiff).to_string(),
            "-compress".to_string(),
            flag(ctx.compress_output).to_string(),
        ];

        if let Some(lut) = &ctx.lut_path {
            arguments.extend(["-lut".to_string(), lut.clone()]);
        }
        if let Some(period) = time_period(tiles) {
            arguments.extend(["-timeperiod".to_string(), period]);
        }

        arguments.push("-il".to_string());
        arguments.extend(tiles.iter().map(|t| t.tile_file.clone()));

        let layers: Vec<BTreeMap<String, String>> =
            results.iter().map(|files| tile_layers(ctx, files)).collect();
        for output in VEGETATION_OUTPUTS {
            let mut layer_args = Vec::new();
            for (files, tile_layers) in results.iter().zip(&layers) {
                if let Some(file) = tile_layers.get(output.key) {
                    layer_args.push(tile_token(&files.tile_id));
                    layer_args.push(file.clone());
                }
            }
            if !layer_args.is_empty() {
                arguments.push(output.formatter_param());
                arguments.extend(layer_args);
            }
        }
        arguments
    }
}

fn file_in(dir: &Path, name: &str) -> String {
    dir.join(name).display().to_string()
}

/// `<first>_<last>` acquisition dates of the contributing products
fn time_period(tiles: &[TileInfos]) -> Option<String> {
    let first = tiles.iter().map(|t| t.parent_product.created).min()?;
    let last = tiles.iter().map(|t| t.parent_product.created).max()?;
    Some(format!(
        "{}_{}",
        first.format(SCHEDULED_DATE_FORMAT),
        last.format(SCHEDULED_DATE_FORMAT)
    ))
}

/// Formatter layer key to file for one tile
fn tile_layers(ctx: &L3bJobContext, files: &TileResultFiles) -> BTreeMap<String, String> {
    let mut layers = BTreeMap::new();
    for index in &ctx.spectral_indices {
        if let Some(file) = files.index_files.get(&index.name) {
            layers.insert(index.param_name.clone(), file.clone());
        }
    }
    for bi in &ctx.biophysical_indices {
        if let Some(file) = files.index_files.get(&bi.name) {
            layers.insert(biophysical_key(&bi.name), file.clone());
        }
        if let Some(file) = files.error_files.get(&bi.name) {
            layers.insert(biophysical_error_key(&bi.name), file.clone());
        }
        if let Some(file) = files.domain_flags_files.get(&bi.name) {
            layers.insert(domain_flags_key(&bi.name), file.clone());
        }
    }
    if !files.status_flags_file.is_empty() {
        layers.insert(STATUS_FLAGS_KEY.to_string(), files.status_flags_file.clone());
    }
    if let Some(file) = &files.in_domain_flags_file {
        layers.insert(IN_DOMAIN_FLAGS_KEY.to_string(), file.clone());
    }
    layers
}

//! # Orchestrator Constants
//!
//! Configuration keys, sidecar file names and well-known literals shared by the
//! handler framework and the processors.

/// Configuration keys read from the job configuration snapshot
pub mod keys {
    /// Final product location template, supports `{site}` and `{processor}`
    pub const PRODUCTS_LOCATION: &str = "archiver.archive_path";
    /// Request-level explicit season selection
    pub const SITE_SEASON_ID: &str = "site_season_id";
    /// Prefix for the executable path of a step: `executor.module.path.<step>`
    pub const MODULE_PATH_PREFIX: &str = "executor.module.path.";
    /// Prefix for per-processor executor settings: `executor.processor.<short>.`
    pub const EXECUTOR_PROCESSOR_PREFIX: &str = "executor.processor.";
    pub const KEEP_JOB_FOLDERS_SUFFIX: &str = "keep_job_folders";
    pub const LAUNCHER_SUFFIX: &str = "launcher";
    /// Prefix for processor tunables: `processor.<short>.`
    pub const PROCESSOR_PREFIX: &str = "processor.";
    pub const CLOUD_OPTIMIZED_GEOTIFF_SUFFIX: &str = "cloud_optimized_geotiff_output";
    pub const COMPRESS_OUTPUT_SUFFIX: &str = "compress_tiffs";
}

/// Job parameter names carried in the JSON blob of a submitted job
pub mod params {
    pub const INPUT_PRODUCTS: &str = "input_products";
    pub const INPUT_PREFIX: &str = "input_";
    pub const START_DATE: &str = "start_date";
    pub const END_DATE: &str = "end_date";
    pub const SCHEDULED_DATE_FORMAT: &str = "%Y%m%d";
    pub const TILES_FILTER: &str = "tiles_filter";
    pub const RESOLUTION: &str = "resolution";
    pub const PRODUCE_PREFIX: &str = "produce_";
    pub const IN_DOMAIN_FLAGS: &str = "indomflags";
    pub const PARALLELIZE_PRODUCTS: &str = "parallelize_products";
}

/// File names exchanged with the product-formatting step
pub mod sidecar {
    /// Written by the formatter: first line is the produced product path
    pub const OUTPUT_PROPERTIES_FILE: &str = "product_properties.txt";
    /// Written by the orchestrator before submission: one parent id per line
    pub const PARENT_PRODUCT_IDS_FILE: &str = "source_product_ids.txt";
    /// Manifest enumerating the tiles and their result files
    pub const EXECUTION_INFOS_FILE: &str = "executionInfos.json";
}

/// Placeholder polygon registered when a product footprint cannot be read
pub const DEFAULT_FOOTPRINT: &str =
    "POLYGON((0.0 0.0, 0.0 0.0, 0.0 0.0, 0.0 0.0, 0.0 0.0))";

/// Token separating per-tile file lists on formatter command lines
pub const TILE_PREFIX: &str = "TILE_";

/// Marker inserted in the quicklook file name by the product formatter
pub const QUICKLOOK_MARKER: &str = "_PVI_";

/// Folder of the formatted product holding the legacy metadata files
pub const LEGACY_DATA_FOLDER: &str = "LEGACY_DATA";

/// Marker inserted in the metadata file name by the product formatter
pub const METADATA_MARKER: &str = "_MTD_";

/// Raster no-data value used by the continuous vegetation outputs
pub const CONTINUOUS_NO_DATA: i32 = -10000;

pub const DEFAULT_RESOLUTION: u32 = 10;

//! Per-tile working state accumulated while the LAI task graph is built.

use crate::models::{Product, ProductId};
use crate::orchestration::product_output::find_file;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

const ANGLES_FILE_SUFFIX: &str = "_ANGLES.tif";
const EXTERNAL_MASK_FILE_SUFFIX: &str = "_EXT_MSK.tif";

/// One input tile of the job and the L2A product it comes from
#[derive(Debug, Clone, PartialEq)]
pub struct TileInfos {
    pub tile_id: String,
    /// Metadata file of the L2A product
    pub tile_file: String,
    /// Optional external mask shipped with the product
    pub external_mask: Option<String>,
    /// Angles raster already present next to the product, if any
    pub existing_angles: Option<String>,
    pub parent_product: Product,
}

impl TileInfos {
    /// Tile of an L2A product; products without tile information are skipped
    pub fn from_product(product: &Product) -> Option<Self> {
        let Some(tile_id) = product.tiles.first() else {
            warn!(
                product_id = product.id,
                product = %product.name,
                "Product has no tile, skipping"
            );
            return None;
        };

        let tile_file = Path::new(&product.full_path);
        let product_folder = if tile_file.extension().is_some() {
            tile_file.parent().unwrap_or(tile_file)
        } else {
            tile_file
        };
        let in_folder = |suffix: &str| {
            find_file(product_folder, |name| name.ends_with(suffix))
                .map(|path| path.display().to_string())
        };

        Some(Self {
            tile_id: tile_id.clone(),
            tile_file: product.full_path.clone(),
            external_mask: in_folder(EXTERNAL_MASK_FILE_SUFFIX),
            existing_angles: in_folder(ANGLES_FILE_SUFFIX),
            parent_product: product.clone(),
        })
    }

    pub fn parent_product_id(&self) -> ProductId {
        self.parent_product.id
    }
}

/// Files produced for one tile. Serialized into the execution-infos manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TileResultFiles {
    pub tile_id: String,
    pub tile_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_prd_ext_msk: Option<String>,
    /// Final raster of every produced index keyed by index name
    pub index_files: BTreeMap<String, String>,
    /// Error raster of every biophysical index keyed by index name
    pub error_files: BTreeMap<String, String>,
    pub status_flags_file: String,
    pub status_flags_file_resampled: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_domain_flags_file: Option<String>,
    /// Output domain flags keyed by biophysical index name
    pub domain_flags_files: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angles_file: Option<String>,
    /// Intermediate rasters nothing reads once the formatter ran
    #[serde(skip)]
    pub temporary_files: Vec<String>,
}

impl TileResultFiles {
    pub fn new(tile: &TileInfos) -> Self {
        Self {
            tile_id: tile.tile_id.clone(),
            tile_file: tile.tile_file.clone(),
            in_prd_ext_msk: tile.external_mask.clone(),
            angles_file: tile.existing_angles.clone(),
            ..Self::default()
        }
    }

    /// Whether the angles raster still has to be generated
    pub fn needs_angles(&self) -> bool {
        self.angles_file.is_none()
    }
}

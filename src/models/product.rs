use super::{JobId, ProcessorId, ProductId, SiteId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MACCS file-type tokens of L2A products (valid and not-valid tiles)
const MACCS_L2A_TOKENS: [&str; 2] = ["L2VALD", "L2NOTV"];

/// Processing level of a catalog product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Atmospherically corrected surface reflectance
    L2a,
    /// Cloud-free composite
    L3a,
    /// Mono-date vegetation status (NDVI, LAI, FAPAR, FCOVER)
    L3b,
    /// Reprocessed LAI
    L3c,
    /// Fitted LAI
    L3d,
    /// Phenology indicators
    L3e,
    /// Crop mask
    L4a,
    /// Crop type map
    L4b,
}

impl ProductType {
    pub const ALL: [ProductType; 8] = [
        Self::L2a,
        Self::L3a,
        Self::L3b,
        Self::L3c,
        Self::L3d,
        Self::L3e,
        Self::L4a,
        Self::L4b,
    ];

    /// Catalog identifier of the product type
    pub fn id(&self) -> i32 {
        match self {
            Self::L2a => 1,
            Self::L3a => 2,
            Self::L3b => 3,
            Self::L3e => 4,
            Self::L4a => 5,
            Self::L4b => 6,
            Self::L3c => 7,
            Self::L3d => 8,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Lower-case short name used in parameter keys such as `input_l2a`
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::L2a => "l2a",
            Self::L3a => "l3a",
            Self::L3b => "l3b",
            Self::L3c => "l3c",
            Self::L3d => "l3d",
            Self::L3e => "l3e",
            Self::L4a => "l4a",
            Self::L4b => "l4b",
        }
    }

    /// Classify a product from the level token embedded in its name. Handles
    /// Sen2Agri (`_L3B_`), Sentinel-2/MAJA (`MSIL2A`, `_L2A_`) and MACCS
    /// (`_L2VALD_`, `_L2NOTV_`) naming.
    pub fn from_product_name(name: &str) -> Option<Self> {
        name.split(['_', '.'])
            .find_map(|token| {
                let token = token.to_ascii_uppercase();
                if MACCS_L2A_TOKENS.contains(&token.as_str()) {
                    return Some(Self::L2a);
                }
                let level = token.strip_prefix("MSI").unwrap_or(&token).to_string();
                Self::ALL
                    .into_iter()
                    .find(|t| t.short_name().eq_ignore_ascii_case(&level))
            })
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl std::str::FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid product type: {s}"))
    }
}

/// Product as read from the catalog; never mutated by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub product_type: ProductType,
    pub processor_id: ProcessorId,
    pub site_id: SiteId,
    pub name: String,
    pub full_path: String,
    pub created: NaiveDateTime,
    #[serde(default)]
    pub tiles: Vec<String>,
}

impl Product {
    pub fn has_tile(&self, tile_id: &str) -> bool {
        self.tiles.iter().any(|t| t == tile_id)
    }
}

/// Registration request for a product produced by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_type: ProductType,
    pub processor_id: ProcessorId,
    pub site_id: SiteId,
    pub job_id: JobId,
    pub full_path: String,
    pub name: String,
    pub created: NaiveDateTime,
    pub quicklook: String,
    pub footprint: String,
    pub tiles: Vec<String>,
    /// Source products recorded as provenance of the new product
    pub parent_product_ids: Vec<ProductId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_type_round_trip() {
        for t in ProductType::ALL {
            assert_eq!(ProductType::from_id(t.id()), Some(t));
            assert_eq!(t.short_name().parse::<ProductType>(), Ok(t));
        }
    }

    #[test]
    fn test_product_type_from_name() {
        assert_eq!(
            ProductType::from_product_name("S2A_MSIL2A_20180612T102021_N0206_R065_T32TQR"),
            Some(ProductType::L2a)
        );
        assert_eq!(
            ProductType::from_product_name("S2AGRI_L3B_PRD_S12_20180612T102021_V20180610"),
            Some(ProductType::L3b)
        );
        assert_eq!(ProductType::from_product_name("LC08_L1TP_196030"), None);
    }

    #[test]
    fn test_maccs_and_maja_names_are_l2a() {
        for name in [
            "S2A_OPER_SSC_L2VALD_31TCJ____20170101.HDR",
            "L8_TEST_L8C_L2NOTV_196030_20170312.HDR",
            "SENTINEL2A_20170101-105435-456_L2A_T31TCJ_D_V1-4",
        ] {
            assert_eq!(ProductType::from_product_name(name), Some(ProductType::L2a), "{name}");
        }
    }
}

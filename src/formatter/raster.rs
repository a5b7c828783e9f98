//! Raster classification driving how the product formatter treats each input.

use crate::constants::CONTINUOUS_NO_DATA;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterType {
    GenericFile,
    GenericRaster,
    DiscreteValues,
    SimpleFlags,
    DiscreteFlags,
    QualityFlags,
    Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampler {
    Nearest,
    Average,
}

impl Resampler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Average => "average",
        }
    }
}

/// How the formatter handles a raster of a given classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterTreatment {
    /// Values are classes or flags; never interpolated
    pub discrete: bool,
    /// Placed with the quality-indicator data instead of the image data
    pub quality_data: bool,
    pub preview: bool,
    pub resampler: Resampler,
    pub no_data: Option<i32>,
}

impl RasterTreatment {
    pub const GENERIC: Self = Self {
        discrete: false,
        quality_data: false,
        preview: true,
        resampler: Resampler::Average,
        no_data: Some(CONTINUOUS_NO_DATA),
    };

    fn for_type(raster_type: RasterType) -> Self {
        match raster_type {
            RasterType::GenericFile | RasterType::GenericRaster => Self::GENERIC,
            RasterType::DiscreteValues => Self {
                discrete: true,
                quality_data: false,
                preview: false,
                resampler: Resampler::Nearest,
                no_data: None,
            },
            RasterType::SimpleFlags => Self {
                quality_data: true,
                preview: false,
                ..Self::GENERIC
            },
            RasterType::DiscreteFlags | RasterType::QualityFlags => Self {
                discrete: true,
                quality_data: true,
                preview: false,
                resampler: Resampler::Nearest,
                no_data: None,
            },
            RasterType::Rgb => Self {
                no_data: None,
                ..Self::GENERIC
            },
        }
    }

    /// Treatment for a raster carrying the given type flags.
    ///
    /// No flag or a single flag is classified directly. Combinations are
    /// not classified: they take the generic path.
    pub fn classify(flags: &[RasterType]) -> Self {
        let distinct: BTreeSet<RasterType> = flags.iter().copied().collect();
        let mut iter = distinct.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Self::GENERIC,
            (Some(single), None) => Self::for_type(*single),
            (Some(_), Some(_)) => {
                warn!(
                    flags = ?distinct,
                    "Unclassified raster type combination, using generic treatment"
                );
                Self::GENERIC
            }
        }
    }
}

//! # Product Formatter Support
//!
//! Raster classification and the vegetation layer table used to build the
//! product formatter's command line and the optional GeoTIFF optimisation steps.

pub mod raster;
pub mod vegetation;

pub use raster::{RasterTreatment, RasterType, Resampler};
pub use vegetation::{optimize_gtiff_args, vegetation_output, VegetationOutput, VEGETATION_OUTPUTS};

//! Vegetation product layers understood by the product formatter.

use super::raster::{RasterTreatment, RasterType};
use crate::constants::CONTINUOUS_NO_DATA;

/// Formatter parameter namespace of the vegetation product
pub const VEGETATION_PARAM_PREFIX: &str = "processor.vegetation.";

/// One layer of a vegetation product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VegetationOutput {
    /// Parameter suffix, passed as `-processor.vegetation.<key>`
    pub key: &'static str,
    pub raster_type: RasterType,
    pub preview: bool,
    /// File name suffix used inside the formatted product
    pub suffix: &'static str,
}

impl VegetationOutput {
    const fn new(
        key: &'static str,
        raster_type: RasterType,
        preview: bool,
        suffix: &'static str,
    ) -> Self {
        Self {
            key,
            raster_type,
            preview,
            suffix,
        }
    }

    pub fn formatter_param(&self) -> String {
        format!("-{VEGETATION_PARAM_PREFIX}{}", self.key)
    }

    pub fn treatment(&self) -> RasterTreatment {
        RasterTreatment::classify(&[self.raster_type])
    }
}

pub const VEGETATION_OUTPUTS: &[VegetationOutput] = &[
    VegetationOutput::new("ndvi", RasterType::GenericRaster, true, "SNDVI"),
    VegetationOutput::new("ndwi", RasterType::GenericRaster, true, "SNDWI"),
    VegetationOutput::new("brightness", RasterType::GenericRaster, true, "SBRIGHT"),
    VegetationOutput::new("laimonodate", RasterType::GenericRaster, true, "SLAIMONO"),
    VegetationOutput::new("laimonodateerr", RasterType::SimpleFlags, false, "MLAIERR"),
    VegetationOutput::new("faparmonodate", RasterType::GenericRaster, false, "SFAPARMONO"),
    VegetationOutput::new("fcovermonodate", RasterType::GenericRaster, false, "SFCOVERMONO"),
    VegetationOutput::new("laistatusflgs", RasterType::DiscreteFlags, false, "MMONODFLG"),
    VegetationOutput::new("indomainflgs", RasterType::DiscreteFlags, false, "MINDOMFLG"),
    VegetationOutput::new("laidomainflgs", RasterType::DiscreteFlags, false, "MLAIDOMFLG"),
    VegetationOutput::new("fapardomainflgs", RasterType::DiscreteFlags, false, "MFAPARDOMFLG"),
    VegetationOutput::new("fcoverdomainflgs", RasterType::DiscreteFlags, false, "MFCOVERDOMFLG"),
];

pub const STATUS_FLAGS_KEY: &str = "laistatusflgs";
pub const IN_DOMAIN_FLAGS_KEY: &str = "indomainflgs";

pub fn vegetation_output(key: &str) -> Option<&'static VegetationOutput> {
    VEGETATION_OUTPUTS.iter().find(|o| o.key == key)
}

/// Layer key of a biophysical index raster, e.g. `laimonodate`
pub fn biophysical_key(index_name: &str) -> String {
    format!("{index_name}monodate")
}

pub fn biophysical_error_key(index_name: &str) -> String {
    format!("{index_name}monodateerr")
}

pub fn domain_flags_key(index_name: &str) -> String {
    format!("{index_name}domainflgs")
}

/// Arguments of `optimize_gtiff` for one raster; `None` when neither
/// compression nor cloud-optimized output is requested
pub fn optimize_gtiff_args(
    raster_file: &str,
    treatment: &RasterTreatment,
    cloud_optimized: bool,
    compress: bool,
) -> Option<Vec<String>> {
    if !cloud_optimized && !compress {
        return None;
    }

    let mut args: Vec<String> = Vec::new();
    if compress {
        args.extend(["--compress".to_string(), "DEFLATE".to_string()]);
    } else {
        args.push("--no-compress".to_string());
    }
    if !treatment.discrete {
        let no_data = treatment.no_data.unwrap_or(CONTINUOUS_NO_DATA);
        args.extend(["--no-data".to_string(), no_data.to_string()]);
    }
    if cloud_optimized {
        args.extend([
            "--resampler".to_string(),
            treatment.resampler.as_str().to_string(),
            "--overviews".to_string(),
            "--tiled".to_string(),
        ]);
    } else {
        args.extend(["--no-overviews".to_string(), "--stripped".to_string()]);
    }
    args.push(raster_file.to_string());
    Some(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_lookup() {
        assert_eq!(vegetation_output("ndvi").map(|o| o.suffix), Some("SNDVI"));
        assert_eq!(
            vegetation_output(&biophysical_error_key("lai")).map(|o| o.raster_type),
            Some(RasterType::SimpleFlags)
        );
        assert!(vegetation_output(&biophysical_error_key("fapar")).is_none());
        assert_eq!(
            vegetation_output(&domain_flags_key("fcover")).unwrap().formatter_param(),
            "-processor.vegetation.fcoverdomainflgs"
        );
    }

    #[test]
    fn test_optimize_arguments() {
        let continuous = vegetation_output("laimonodate").unwrap().treatment();
        assert_eq!(optimize_gtiff_args("lai.tif", &continuous, false, false), None);
        assert_eq!(
            optimize_gtiff_args("lai.tif", &continuous, true, true).unwrap(),
            vec![
                "--compress", "DEFLATE", "--no-data", "-10000", "--resampler", "average",
                "--overviews", "--tiled", "lai.tif"
            ]
        );

        let flags = vegetation_output(STATUS_FLAGS_KEY).unwrap().treatment();
        assert_eq!(
            optimize_gtiff_args("flags.tif", &flags, false, true).unwrap(),
            vec!["--compress", "DEFLATE", "--no-overviews", "--stripped", "flags.tif"]
        );
    }
}

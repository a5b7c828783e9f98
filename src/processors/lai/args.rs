//! Command lines of the external programs chained by the LAI processor.
//!
//! Step names double as the lookup keys of `executor.module.path.<step>`.

use crate::constants::CONTINUOUS_NO_DATA;

pub mod steps {
    pub const CREATE_ANGLES: &str = "lai-create-angles";
    pub const GDAL_TRANSLATE: &str = "gdal_translate";
    pub const GDAL_BUILD_VRT: &str = "gdalbuildvrt";
    pub const MONO_DATE_MASK_FLAGS: &str = "lai-msk-flags";
    pub const IN_DOMAIN_FLAGS: &str = "lai-in-domain-flags";
    pub const OUT_DOMAIN_FLAGS: &str = "lai-out-domain-flags";
    pub const SPECTRAL_INDEX_EXTRACTION: &str = "lai-spectral-indices";
    pub const LAI_PROCESSOR: &str = "lai-processor";
    pub const QUANTIFY_IMAGE: &str = "lai-quantify-image";
    pub const MODEL_LEARNING: &str = "lai-inverse-model-learning";
    pub const PRODUCT_FORMATTER: &str = "product-formatter";
    pub const OPTIMIZE_GTIFF: &str = "optimize-gtiff";
    pub const FILES_REMOVER: &str = "files-remover";
}

/// Task module names
pub mod modules {
    pub const MODELS: &str = "lai-models-generation";
    pub const ANGLES: &str = "lai-angles";
    pub const STATUS_FLAGS: &str = "lai-mono-date-mask-flags";
    pub const SPECTRAL_INDEX: &str = "lai-spectral-index";
    pub const BIOPHYSICAL_INDEX: &str = "lai-processor";
    pub const DOMAIN_FLAGS: &str = "lai-domain-flags";
    pub const PRODUCT_FORMATTER: &str = "lai-product-formatter";
}

fn owned<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}

pub fn files_remover_args(files: &[String]) -> Vec<String> {
    let mut args = owned(["-f"]);
    args.extend(files.iter().cloned());
    args
}

pub fn create_angles_args(input_product: &str, angles_file: &str) -> Vec<String> {
    owned(["-in", input_product, "-out", angles_file])
}

pub fn angles_no_data_args(angles_file: &str, result_file: &str) -> Vec<String> {
    owned(["-a_nodata", "-10000", angles_file, result_file])
}

pub fn angles_vrt_args(angles_file: &str, result_vrt: &str) -> Vec<String> {
    owned(["-separate", "-overwrite", result_vrt, angles_file])
}

pub fn resample_angles_args(vrt_file: &str, result_file: &str, resolution: &str) -> Vec<String> {
    owned([
        "-tr", resolution, resolution, "-r", "bilinear", "-of", "GTiff", vrt_file, result_file,
    ])
}

pub fn mono_date_mask_flags_args(
    input_product: &str,
    external_mask: Option<&str>,
    flags_file: &str,
    resampled_flags_file: &str,
    resolution: &str,
) -> Vec<String> {
    let mut args = owned(["-inxml", input_product]);
    if let Some(mask) = external_mask {
        args.extend(owned(["-extmask", mask]));
    }
    args.extend(owned([
        "-out",
        flags_file,
        "-outres",
        resolution,
        "-outresampled",
        resampled_flags_file,
    ]));
    args
}

pub fn input_domain_flags_args(
    xml_file: &str,
    bands_cfg: &str,
    flags_file: &str,
    resolution: &str,
) -> Vec<String> {
    owned([
        "-xml", xml_file, "-laicfgs", bands_cfg, "-out", flags_file, "-outres", resolution,
    ])
}

pub fn output_domain_flags_args(
    xml_file: &str,
    index_file: &str,
    bands_cfg: &str,
    index_name: &str,
    flags_file: &str,
    corrected_file: &str,
    resolution: &str,
) -> Vec<String> {
    owned([
        "-xml",
        xml_file,
        "-in",
        index_file,
        "-laicfgs",
        bands_cfg,
        "-indextype",
        index_name,
        "-outf",
        flags_file,
        "-out",
        corrected_file,
        "-outres",
        resolution,
    ])
}

pub fn spectral_index_args(
    input_product: &str,
    index_type: &str,
    mask_flags_file: &str,
    index_file: &str,
) -> Vec<String> {
    owned([
        "-xml",
        input_product,
        "-msks",
        mask_flags_file,
        "-indextype",
        index_type,
        "-out",
        index_file,
        "-nodata",
        &CONTINUOUS_NO_DATA.to_string(),
    ])
}

/// Retrieval of one biophysical index with its model pair
pub struct RetrievalArgs<'a> {
    pub xml_file: &'a str,
    pub angles_file: &'a str,
    pub resolution: &'a str,
    pub bands_cfg: &'a str,
    pub index_name: &'a str,
    pub model: &'a str,
    pub err_model: &'a str,
    pub out_file: &'a str,
    pub out_err_file: &'a str,
}

pub fn lai_processor_args(args: &RetrievalArgs<'_>) -> Vec<String> {
    owned([
        "-xml",
        args.xml_file,
        "-angles",
        args.angles_file,
        "-outres",
        args.resolution,
        "-laicfgs",
        args.bands_cfg,
        "-indextype",
        args.index_name,
        "-modelfile",
        args.model,
        "-errmodelfile",
        args.err_model,
        "-out",
        args.out_file,
        "-outerr",
        args.out_err_file,
    ])
}

pub fn quantify_image_args(input_file: &str, output_file: &str) -> Vec<String> {
    owned(["-in", input_file, "-out", output_file])
}

pub fn model_learning_args(
    xml_file: &str,
    bands_cfg: &str,
    index_name: &str,
    model_file: &str,
    err_model_file: &str,
) -> Vec<String> {
    owned([
        "-xml",
        xml_file,
        "-laicfgs",
        bands_cfg,
        "-indextype",
        index_name,
        "-outmodel",
        model_file,
        "-outerrmodel",
        err_model_file,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_flags_external_mask_is_optional() {
        let without = mono_date_mask_flags_args("p.xml", None, "f.tif", "fr.tif", "10");
        assert!(!without.contains(&"-extmask".to_string()));

        let with = mono_date_mask_flags_args("p.xml", Some("m.tif"), "f.tif", "fr.tif", "20");
        assert_eq!(&with[2..4], ["-extmask", "m.tif"]);
        assert_eq!(with.last().map(String::as_str), Some("fr.tif"));
    }

    #[test]
    fn test_retrieval_arguments() {
        let args = lai_processor_args(&RetrievalArgs {
            xml_file: "p.xml",
            angles_file: "a.tif",
            resolution: "10",
            bands_cfg: "bands.txt",
            index_name: "lai",
            model: "m.txt",
            err_model: "e.txt",
            out_file: "lai.tif",
            out_err_file: "lai_err.tif",
        });
        let position = args.iter().position(|a| a == "-modelfile").unwrap();
        assert_eq!(args[position + 1], "m.txt");
        assert_eq!(args.len(), 18);
    }
}

//! Quicklook and footprint discovery inside a formatted product folder.

use crate::constants::{DEFAULT_FOOTPRINT, LEGACY_DATA_FOLDER, METADATA_MARKER, QUICKLOOK_MARKER};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXT_POS_LIST_OPEN: &str = "<EXT_POS_LIST>";
const EXT_POS_LIST_CLOSE: &str = "</EXT_POS_LIST>";
/// A ring needs at least five points, i.e. more than four coordinate pairs
const MIN_FOOTPRINT_VALUES: usize = 8;

/// First file of `folder`, in name order, whose name satisfies `matches`
pub(crate) fn find_file(folder: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(folder = %folder.display(), error = %e, "Unable to list product folder");
            return None;
        }
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| matches(&name.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    found.into_iter().next()
}

/// Preview image (`*_PVI_*.jpg`) of a formatted product
pub fn product_quicklook(product_path: &Path) -> Option<PathBuf> {
    find_file(product_path, |name| {
        name.contains(QUICKLOOK_MARKER) && name.to_ascii_lowercase().ends_with(".jpg")
    })
}

/// Footprint polygon of a formatted product, read from the `EXT_POS_LIST`
/// of its legacy metadata file. Falls back to the degenerate default polygon.
pub fn product_footprint(product_path: &Path) -> String {
    let legacy = product_path.join(LEGACY_DATA_FOLDER);
    let Some(metadata) = find_file(&legacy, |name| {
        name.contains(METADATA_MARKER) && name.to_ascii_lowercase().ends_with(".xml")
    }) else {
        return DEFAULT_FOOTPRINT.to_string();
    };

    match fs::read_to_string(&metadata) {
        Ok(content) => footprint_from_metadata(&content).unwrap_or_else(|| {
            warn!(metadata = %metadata.display(), "No usable footprint in product metadata");
            DEFAULT_FOOTPRINT.to_string()
        }),
        Err(e) => {
            warn!(metadata = %metadata.display(), error = %e, "Unable to read product metadata");
            DEFAULT_FOOTPRINT.to_string()
        }
    }
}

/// WKT polygon from the first `EXT_POS_LIST` element of a metadata document
pub fn footprint_from_metadata(content: &str) -> Option<String> {
    let start = content.find(EXT_POS_LIST_OPEN)? + EXT_POS_LIST_OPEN.len();
    let end = start + content[start..].find(EXT_POS_LIST_CLOSE)?;

    let values: Vec<&str> = content[start..end].split_whitespace().collect();
    if values.len() <= MIN_FOOTPRINT_VALUES || values.len() % 2 != 0 {
        return None;
    }
    if values.iter().any(|v| v.parse::<f64>().is_err()) {
        return None;
    }

    let points: Vec<String> = values
        .chunks(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect();
    Some(format!("POLYGON(({}))", points.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const METADATA: &str = r#"<?xml version="1.0"?>
<Earth_Explorer_Header>
  <Global_Footprint>
    <EXT_POS_LIST>1.0 43.0 1.5 43.0 1.5 43.5 1.0 43.5 1.0 43.0</EXT_POS_LIST>
  </Global_Footprint>
</Earth_Explorer_Header>"#;

    #[test]
    fn test_footprint_parsing() {
        assert_eq!(
            footprint_from_metadata(METADATA).as_deref(),
            Some("POLYGON((1.0 43.0, 1.5 43.0, 1.5 43.5, 1.0 43.5, 1.0 43.0))")
        );
        assert_eq!(
            footprint_from_metadata("<EXT_POS_LIST>1 2 3 4 5 6 7 8</EXT_POS_LIST>"),
            None
        );
        assert_eq!(
            footprint_from_metadata("<EXT_POS_LIST>1 2 3 4 5 6 7 8 9</EXT_POS_LIST>"),
            None
        );
        assert_eq!(footprint_from_metadata("<root/>"), None);
    }

    #[test]
    fn test_product_folder_discovery() {
        let dir = TempDir::new().unwrap();
        let product = dir.path().join("S2AGRI_L3B_PRD_S1_V20230401");
        fs::create_dir_all(product.join(LEGACY_DATA_FOLDER)).unwrap();
        fs::write(product.join("S2AGRI_L3B_PVI_S1_V20230401.jpg"), b"jpg").unwrap();
        fs::write(
            product
                .join(LEGACY_DATA_FOLDER)
                .join("S2AGRI_L3B_MTD_S1_V20230401.xml"),
            METADATA,
        )
        .unwrap();

        assert_eq!(
            product_quicklook(&product),
            Some(product.join("S2AGRI_L3B_PVI_S1_V20230401.jpg"))
        );
        assert!(product_footprint(&product).starts_with("POLYGON((1.0 43.0"));
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        assert_eq!(product_quicklook(dir.path()), None);
        assert_eq!(product_footprint(dir.path()), DEFAULT_FOOTPRINT);
    }
}

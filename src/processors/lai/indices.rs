//! # Vegetation Index Catalog
//!
//! Descriptor tables of the indices the LAI processor can produce. The tables
//! are part of [`OrchestratorConfig`](crate::config::OrchestratorConfig) and are
//! injected into the handler at construction.

use crate::config::{ConfigResult, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Spectral index computed directly from the L2A reflectances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectralIndexDescriptor {
    /// Index name used in `produce_<name>` flags and file names
    pub name: String,
    /// Index identifier understood by the extraction program
    #[serde(rename = "type")]
    pub index_type: String,
    /// Formatter parameter receiving the index rasters, `processor.vegetation.<param_name>`
    pub param_name: String,
}

impl SpectralIndexDescriptor {
    pub fn new(
        name: impl Into<String>,
        index_type: impl Into<String>,
        param_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            index_type: index_type.into(),
            param_name: param_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCatalog {
    #[serde(default = "default_spectral")]
    pub spectral: Vec<SpectralIndexDescriptor>,
    /// Model-based indices (`lai`, `fapar`, `fcover`)
    #[serde(default = "default_biophysical")]
    pub biophysical: Vec<String>,
}

fn default_spectral() -> Vec<SpectralIndexDescriptor> {
    vec![
        SpectralIndexDescriptor::new("ndvi", "NDVI", "ndvi"),
        SpectralIndexDescriptor::new("ndwi", "NDWI", "ndwi"),
        SpectralIndexDescriptor::new("brightness", "BRIGHTNESS", "brightness"),
    ]
}

fn default_biophysical() -> Vec<String> {
    ["lai", "fapar", "fcover"].map(str::to_string).to_vec()
}

impl Default for IndexCatalog {
    fn default() -> Self {
        Self {
            spectral: default_spectral(),
            biophysical: default_biophysical(),
        }
    }
}

impl IndexCatalog {
    pub fn spectral_index(&self, name: &str) -> Option<&SpectralIndexDescriptor> {
        self.spectral.iter().find(|d| d.name == name)
    }

    pub fn is_biophysical(&self, name: &str) -> bool {
        self.biophysical.iter().any(|n| n == name)
    }

    /// Every index name, spectral first
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.spectral
            .iter()
            .map(|d| d.name.as_str())
            .chain(self.biophysical.iter().map(String::as_str))
    }

    /// Names must be non-empty and unique across both tables
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for name in self.names() {
            if name.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "indices",
                    name,
                    "index names cannot be empty",
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigurationError::invalid_value(
                    "indices",
                    name,
                    "index declared more than once",
                ));
            }
        }
        for descriptor in &self.spectral {
            if descriptor.index_type.trim().is_empty() || descriptor.param_name.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    format!("indices.spectral.{}", descriptor.name),
                    "",
                    "type and param_name are required",
                ));
            }
        }
        Ok(())
    }
}

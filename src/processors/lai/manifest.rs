//! Execution-infos manifest read by the product formatter.

use super::tile_files::TileResultFiles;
use crate::error::{OrchestratorError, Result};
use crate::models::JobId;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionInfos {
    pub job_id: JobId,
    pub resolution: u32,
    pub tiles: Vec<TileResultFiles>,
}

impl ExecutionInfos {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OrchestratorError::json("execution infos manifest", e))
    }

    /// Write the manifest, creating the parent folder when needed
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OrchestratorError::io(parent, e))?;
        }
        std::fs::write(path, self.to_json()?).map_err(|e| OrchestratorError::io(path, e))?;
        debug!(
            job_id = self.job_id,
            path = %path.display(),
            tiles = self.tiles.len(),
            "Execution infos written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_lists_every_tile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("formatter").join("executionInfos.json");
        let mut tile = TileResultFiles {
            tile_id: "T1".to_string(),
            tile_file: "/l2a/T1.xml".to_string(),
            ..TileResultFiles::default()
        };
        tile.index_files.insert("ndvi".to_string(), "/jobs/ndvi.tif".to_string());

        let infos = ExecutionInfos {
            job_id: 4,
            resolution: 10,
            tiles: vec![tile],
        };
        infos.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tiles"][0]["tile_id"], "T1");
        assert_eq!(value["tiles"][0]["index_files"]["ndvi"], "/jobs/ndvi.tif");
        assert!(value["tiles"][0].get("angles_file").is_none());
    }
}

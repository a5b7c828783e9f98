//! # Sidecar Files
//!
//! Line-oriented files exchanged with the product-formatting step. The schema is
//! one value per line. The product path file holds the path on its first line;
//! list files skip blank lines. A missing or empty file means "no output" and
//! never fails the caller.

use crate::error::{OrchestratorError, Result};
use crate::models::ProductId;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

fn read_content(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Sidecar file not present");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unable to read sidecar file");
            None
        }
    }
}

/// Trimmed non-empty lines of a sidecar; absent or unreadable files yield nothing
pub fn read_lines(path: &Path) -> Vec<String> {
    read_content(path)
        .map(|content| {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn write_lines<I, S>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| OrchestratorError::io(parent, e))?;
    }
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    fs::write(path, content).map_err(|e| OrchestratorError::io(path, e))
}

/// Record the produced product path (first line of the file)
pub fn write_product_path(path: &Path, product_path: &str) -> Result<()> {
    write_lines(path, [product_path.trim()])
}

/// Product path written by the formatter, if any. Only the first line counts:
/// a blank first line means no product was produced.
pub fn read_product_path(path: &Path) -> Option<String> {
    let content = read_content(path)?;
    let first = content.lines().next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Record parent product ids, skipping non-positive ones
pub fn write_parent_product_ids(path: &Path, ids: &[ProductId]) -> Result<()> {
    write_lines(
        path,
        ids.iter().filter(|id| **id > 0).map(|id| id.to_string()),
    )
}

/// Positive parent ids; unparseable and non-positive lines are ignored
pub fn read_parent_product_ids(path: &Path) -> Vec<ProductId> {
    read_lines(path)
        .into_iter()
        .filter_map(|line| line.parse::<ProductId>().ok())
        .filter(|id| *id > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_mean_no_output() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_product_path(&dir.path().join("absent.txt")), None);
        assert!(read_parent_product_ids(&dir.path().join("absent.txt")).is_empty());
    }

    #[test]
    fn test_empty_file_means_no_output() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("props.txt");
        fs::write(&file, "\n  \n").unwrap();
        assert_eq!(read_product_path(&file), None);
    }

    #[test]
    fn test_product_path_uses_first_line() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("props.txt");
        fs::write(&file, "  /out/S2AGRI_L3B_PRD  \n/ignored\n").unwrap();
        assert_eq!(read_product_path(&file).as_deref(), Some("/out/S2AGRI_L3B_PRD"));
    }

    #[test]
    fn test_blank_first_line_means_no_output() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("props.txt");
        fs::write(&file, "\n/out/S2AGRI_L3B_PRD\n").unwrap();
        assert_eq!(read_product_path(&file), None);
    }

    #[test]
    fn test_product_path_write_then_read_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("task/props.txt");
        write_product_path(&file, "  /out/P  ").unwrap();
        assert_eq!(read_product_path(&file).as_deref(), Some("/out/P"));
    }

    #[test]
    fn test_parent_ids_filtering() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("nested/ids.txt");
        write_parent_product_ids(&file, &[3, -1, 7, 0]).unwrap();
        assert_eq!(read_parent_product_ids(&file), vec![3, 7]);

        fs::write(&file, "4\nabc\n-2\n\n 9 \n").unwrap();
        assert_eq!(read_parent_product_ids(&file), vec![4, 9]);
    }
}

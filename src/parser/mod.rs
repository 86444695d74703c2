pub mod catalog;
pub mod current;
pub mod html;
pub mod schedule;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::Quarter;

/// Saved term documents in `dir` (`INFO_{YEAR}_{QUARTER}.html`), sorted by file name.
pub fn list_term_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read directory {:?}", dir))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_term_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| {
                n.strip_prefix("INFO_")
                    .and_then(|rest| rest.strip_suffix(".html"))
                    .is_some_and(|mid| mid.contains('_'))
            });
        if is_term_file && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// `INFO_2019_AUT.html` → (2019, AUT). The directory part of the path is ignored.
pub fn parse_term_filename(path: &Path) -> Option<(i32, Quarter)> {
    let name = path.file_name()?.to_str()?;
    let mut parts = name.split('_');
    let _prefix = parts.next()?;
    let year = parts.next()?.parse::<i32>().ok()?;
    let quarter = parts.next()?.split('.').next()?.parse::<Quarter>().ok()?;
    Some((year, quarter))
}

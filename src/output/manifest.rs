//! JSON manifest of harvested images

use crate::output::OutputResult;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Writes the filename to source URL mapping as a pretty-printed JSON object
///
/// Parent directories are created as needed. Keys come out sorted.
pub fn write_manifest(downloads: &BTreeMap<String, String>, path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(downloads)?;
    fs::write(path, json)?;

    tracing::info!("Wrote manifest with {} entries to {}", downloads.len(), path.display());
    Ok(())
}

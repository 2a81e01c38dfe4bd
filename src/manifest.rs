use crate::error_utils::serialize_to_json_with_context;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Default name of the manifest written after each run
pub const DEFAULT_MANIFEST_FILE: &str = "uploaded_photos.json";

/// One successfully uploaded photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Name of the file on the disk
    pub file_name: String,
    /// VK size-class tag of the uploaded variant (e.g. "z", "w")
    pub size: String,
}

pub fn build_manifest_entry(file_name: &str, size_tag: &str) -> UploadRecord {
    UploadRecord {
        file_name: file_name.to_string(),
        size: size_tag.to_string(),
    }
}

/// Writes the records as an indented JSON array, replacing any existing file
pub fn persist_manifest(records: &[UploadRecord], path: &Path) -> Result<()> {
    let json = serialize_to_json_with_context(&records, "upload manifest")?;
    fs::write(path, json).with_context(|| {
        format!(
            "Failed to write upload manifest to {path}",
            path = path.display()
        )
    })?;

    info!(
        "Saved information about {count} uploaded photos to {path}",
        count = records.len(),
        path = path.display()
    );

    Ok(())
}

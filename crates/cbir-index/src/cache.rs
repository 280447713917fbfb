//! JSON descriptor cache: `image id -> nested sub-descriptor arrays`, one
//! file per corpus snapshot.
//!
//! The cache is consulted before extraction and written through as new
//! entries are computed. It is the authoritative snapshot: entries survive
//! even when the source file disappears from the dataset directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use cbir_core::types::{DescriptorBundle, ImageId};

pub type Snapshot = BTreeMap<ImageId, DescriptorBundle>;

/// Load a snapshot; a missing file is an empty snapshot, not an error.
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Ok(Snapshot::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading descriptor cache {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing descriptor cache {}", path.display()))
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let raw = serde_json::to_string(snapshot)?;
    fs::write(path, raw)
        .with_context(|| format!("writing descriptor cache {}", path.display()))
}

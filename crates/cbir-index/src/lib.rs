//! In-memory corpus index: one precomputed descriptor bundle per image,
//! built once at load time from the JSON cache plus a dataset scan, and
//! read-only afterward.

pub mod cache;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use cbir_core::error::Error;
use cbir_core::traits::Extractor;
use cbir_core::types::{DescriptorBundle, ImageId};
use cbir_descriptors::DescriptorExtractor;

/// Extensions accepted as corpus images.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Persist the snapshot after this many freshly computed entries.
const SAVE_EVERY: usize = 25;

#[derive(Debug)]
pub struct CorpusIndex {
    ids: Vec<ImageId>,
    bundles: Vec<DescriptorBundle>,
    by_id: HashMap<ImageId, usize>,
}

impl CorpusIndex {
    /// Build or restore the index with the standard descriptor pipeline.
    pub fn load(dataset_dir: &Path, cache_path: &Path) -> Result<Self> {
        Self::load_with(dataset_dir, cache_path, &DescriptorExtractor)
    }

    /// Build or restore the index. Cached entries are reused; images missing
    /// from the cache are extracted and appended, and the merged snapshot is
    /// persisted incrementally. Per-image extraction failures are logged and
    /// skipped — they never fail the corpus load.
    pub fn load_with(
        dataset_dir: &Path,
        cache_path: &Path,
        extractor: &dyn Extractor,
    ) -> Result<Self> {
        let mut snapshot = cache::read_snapshot(cache_path)?;
        if !snapshot.is_empty() {
            info!(entries = snapshot.len(), cache = %cache_path.display(), "loaded descriptor cache");
        }

        let files = list_image_files(dataset_dir);
        let missing: Vec<&PathBuf> = files
            .iter()
            .filter(|p| !snapshot.contains_key(&path_id(p)))
            .collect();

        if !missing.is_empty() {
            info!(count = missing.len(), "computing descriptors for uncached images");
            let pb = ProgressBar::new(missing.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            let mut computed = 0usize;
            for path in missing {
                pb.set_message(path.display().to_string());
                match extractor.extract_path(path) {
                    Ok(bundle) => {
                        snapshot.insert(path_id(path), bundle);
                        computed += 1;
                        if computed % SAVE_EVERY == 0 {
                            cache::write_snapshot(cache_path, &snapshot)?;
                        }
                    }
                    Err(e) => {
                        warn!(image = %path.display(), error = %e, "skipping image");
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();
            if computed > 0 {
                cache::write_snapshot(cache_path, &snapshot)?;
            }
            info!(computed, total = snapshot.len(), "descriptor cache updated");
        }

        let mut ids = Vec::with_capacity(snapshot.len());
        let mut bundles = Vec::with_capacity(snapshot.len());
        let mut by_id = HashMap::with_capacity(snapshot.len());
        for (id, bundle) in snapshot {
            by_id.insert(id.clone(), ids.len());
            ids.push(id);
            bundles.push(bundle);
        }
        Ok(Self { ids, bundles, by_id })
    }

    pub fn lookup(&self, id: &str) -> cbir_core::error::Result<&DescriptorBundle> {
        self.position(id)
            .map(|i| &self.bundles[i])
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Index of `id` in corpus order, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn ids(&self) -> &[ImageId] {
        &self.ids
    }

    pub fn bundles(&self) -> &[DescriptorBundle] {
        &self.bundles
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn path_id(path: &Path) -> ImageId {
    path.to_string_lossy().to_string()
}

fn list_image_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

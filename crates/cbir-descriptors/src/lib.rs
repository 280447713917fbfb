//! Multi-modal descriptor extraction: color, texture, and shape sub-vectors
//! from one decoded image.
//!
//! Extraction is a pure function of the pixels. Every sub-vector has a
//! fixed, descriptor-specific length regardless of the input image size; a
//! stage that cannot produce features (e.g. no foreground contour) yields
//! zero vectors of the correct length instead of failing the bundle.

pub mod color;
pub mod shape;
pub mod texture;

use std::path::Path;

use image::DynamicImage;

use cbir_core::error::{Error, Result};
use cbir_core::traits::Extractor;
use cbir_core::types::DescriptorBundle;

/// Compute the full descriptor bundle for a decoded image.
pub fn extract(image: &DynamicImage) -> DescriptorBundle {
    let rgb = image.to_rgb8();
    let gray = image.to_luma8();
    DescriptorBundle {
        color: color::color_features(&rgb),
        texture: texture::texture_features(&gray),
        shape: shape::shape_features(&gray),
    }
}

pub fn extract_bytes(payload: &[u8]) -> Result<DescriptorBundle> {
    let img = image::load_from_memory(payload).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(extract(&img))
}

pub fn extract_path(path: &Path) -> Result<DescriptorBundle> {
    let img = image::open(path).map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;
    Ok(extract(&img))
}

/// Stateless [`Extractor`] over the bundled pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct DescriptorExtractor;

impl Extractor for DescriptorExtractor {
    fn extract_bytes(&self, payload: &[u8]) -> Result<DescriptorBundle> {
        extract_bytes(payload)
    }

    fn extract_path(&self, path: &Path) -> Result<DescriptorBundle> {
        extract_path(path)
    }
}

//! Domain types shared by the descriptor, distance, and feedback engines.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a corpus image: its path string, matching the key used in
/// the persisted descriptor snapshot.
pub type ImageId = String;

/// 256 bins for each of the three color channels.
pub const COLOR_HISTOGRAM_LEN: usize = 768;
/// 3 cluster centers (3 channels each) followed by 3 occupancy fractions.
pub const DOMINANT_COLORS_LEN: usize = 12;
/// Mean filter response at orientations 0°, 45°, 90°, 135°.
pub const GABOR_FILTERS_LEN: usize = 4;
/// Contrast, correlation, energy for each of 4 co-occurrence angles.
pub const GLCM_FEATURES_LEN: usize = 12;
pub const HU_MOMENTS_LEN: usize = 7;
/// Aspect ratio, extent, contour area.
pub const SHAPE_DESCRIPTORS_LEN: usize = 3;

/// Length of a flattened bundle (the feature-matrix row width).
pub const FEATURE_DIM: usize = COLOR_HISTOGRAM_LEN
    + DOMINANT_COLORS_LEN
    + GABOR_FILTERS_LEN
    + GLCM_FEATURES_LEN
    + HU_MOMENTS_LEN
    + SHAPE_DESCRIPTORS_LEN;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorFeatures {
    pub histogram: Vec<f64>,
    pub dominant_colors: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureFeatures {
    pub gabor_filters: Vec<f64>,
    pub glcm_features: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeFeatures {
    pub hu_moments: Vec<f64>,
    pub shape_descriptors: Vec<f64>,
}

impl ShapeFeatures {
    /// Fallback when no foreground contour exists: zero vectors of the
    /// correct lengths, never absent fields.
    pub fn zeroed() -> Self {
        Self {
            hu_moments: vec![0.0; HU_MOMENTS_LEN],
            shape_descriptors: vec![0.0; SHAPE_DESCRIPTORS_LEN],
        }
    }
}

/// Fixed-shape numeric summary of one image.
///
/// Serializes to the nested `type -> sub-descriptor -> [numbers]` JSON used
/// by the persistence collaborator. Every sub-vector has a fixed,
/// descriptor-specific length regardless of the input image size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorBundle {
    pub color: ColorFeatures,
    pub texture: TextureFeatures,
    pub shape: ShapeFeatures,
}

impl DescriptorBundle {
    /// Concatenate every sub-vector in fixed order: color histogram,
    /// dominant colors, gabor, glcm, hu moments, shape descriptors.
    pub fn flatten(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(FEATURE_DIM);
        out.extend_from_slice(&self.color.histogram);
        out.extend_from_slice(&self.color.dominant_colors);
        out.extend_from_slice(&self.texture.gabor_filters);
        out.extend_from_slice(&self.texture.glcm_features);
        out.extend_from_slice(&self.shape.hu_moments);
        out.extend_from_slice(&self.shape.shape_descriptors);
        out
    }
}

/// Lower bound applied to every sub-descriptor weight after a feedback
/// update round.
pub const WEIGHT_FLOOR: f64 = 1e-4;
/// Upper bound applied to every sub-descriptor weight after a feedback
/// update round.
pub const WEIGHT_CEIL: f64 = 1e4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorWeights {
    pub weight: f64,
    pub histogram: f64,
    pub dominant_colors: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureWeights {
    pub weight: f64,
    pub gabor_filters: f64,
    pub glcm_features: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeWeights {
    pub weight: f64,
    pub hu_moments: f64,
    pub shape_descriptors: f64,
}

/// Relative importance of each modality (`weight`) and of the
/// sub-descriptors within it. Read by the distance engine, mutated only by
/// the feedback controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTree {
    pub color: ColorWeights,
    pub texture: TextureWeights,
    pub shape: ShapeWeights,
}

impl Default for WeightTree {
    /// Color-biased tree used by the distance engine when the caller
    /// supplies none.
    fn default() -> Self {
        Self {
            color: ColorWeights { weight: 0.6, histogram: 0.8, dominant_colors: 0.2 },
            texture: TextureWeights { weight: 0.3, gabor_filters: 0.7, glcm_features: 0.3 },
            shape: ShapeWeights { weight: 0.1, hu_moments: 0.6, shape_descriptors: 0.4 },
        }
    }
}

impl WeightTree {
    /// Starting point for a feedback session, before any adaptation.
    pub fn adaptive_start() -> Self {
        Self {
            color: ColorWeights { weight: 0.4, histogram: 0.6, dominant_colors: 0.4 },
            texture: TextureWeights { weight: 0.3, gabor_filters: 0.5, glcm_features: 0.5 },
            shape: ShapeWeights { weight: 0.3, hu_moments: 0.7, shape_descriptors: 0.3 },
        }
    }

    /// Multiply every sub-descriptor weight by `factor`, leaving the
    /// modality-level weights untouched, then clamp to
    /// [`WEIGHT_FLOOR`, `WEIGHT_CEIL`].
    pub fn scale_sub_weights(&mut self, factor: f64) {
        for w in [
            &mut self.color.histogram,
            &mut self.color.dominant_colors,
            &mut self.texture.gabor_filters,
            &mut self.texture.glcm_features,
            &mut self.shape.hu_moments,
            &mut self.shape.shape_descriptors,
        ] {
            *w = (*w * factor).clamp(WEIGHT_FLOOR, WEIGHT_CEIL);
        }
    }

    /// Invariant check: every weight finite and strictly positive.
    pub fn is_finite_positive(&self) -> bool {
        [
            self.color.weight,
            self.color.histogram,
            self.color.dominant_colors,
            self.texture.weight,
            self.texture.gabor_filters,
            self.texture.glcm_features,
            self.shape.weight,
            self.shape.hu_moments,
            self.shape.shape_descriptors,
        ]
        .iter()
        .all(|w| w.is_finite() && *w > 0.0)
    }
}

/// Binary relevance feedback over corpus images.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub relevant: Vec<ImageId>,
    #[serde(default)]
    pub non_relevant: Vec<ImageId>,
}

impl Feedback {
    /// Strict JSON parsing. Anything that does not deserialize cleanly is
    /// rejected as `InvalidFeedback`; feedback text is never evaluated or
    /// interpreted any other way.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidFeedback(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.relevant.is_empty() && self.non_relevant.is_empty()
    }
}

/// One ranked result. `score` is a dissimilarity: lower is more similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ImageId,
    pub score: f64,
}

//! Weighted multi-metric distance between descriptor bundles.
//!
//! Sub-descriptor vectors are min-max normalized independently, compared
//! with a blend of Euclidean, cosine, and Manhattan terms, then fused
//! across the weight tree into one scalar dissimilarity. Lower is more
//! similar; comparisons that cannot be computed score the neutral worst
//! case instead of failing.

use cbir_core::types::{DescriptorBundle, WeightTree};

const EPS: f64 = 1e-10;
/// Worst-case score for a comparison that cannot be computed.
pub const NEUTRAL_DISTANCE: f64 = 1.0;

/// Blended distance between two equal-length vectors:
/// `0.4 * euclidean + 0.3 * (1 - cosine similarity) + 0.3 * manhattan`,
/// computed on the min-max normalized vectors.
pub fn blended_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return NEUTRAL_DISTANCE;
    }
    let na = min_max_normalize(a);
    let nb = min_max_normalize(b);

    let mut sq = 0.0;
    let mut abs = 0.0;
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in na.iter().zip(&nb) {
        let d = x - y;
        sq += d * d;
        abs += d.abs();
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let euclidean = sq.sqrt();
    let manhattan = abs;
    let denom = norm_a.sqrt() * norm_b.sqrt();
    // Two zero-magnitude vectors are identical after normalization; treat
    // them as perfectly aligned so self-distance stays at zero.
    let cosine = if denom < EPS {
        if norm_a.sqrt() < EPS && norm_b.sqrt() < EPS { 1.0 } else { 0.0 }
    } else {
        dot / denom
    };

    let blended = 0.4 * euclidean + 0.3 * (1.0 - cosine) + 0.3 * manhattan;
    if blended.is_finite() { blended } else { NEUTRAL_DISTANCE }
}

fn min_max_normalize(v: &[f64]) -> Vec<f64> {
    let (min, max) = v
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    v.iter().map(|&x| (x - min) / (max - min + EPS)).collect()
}

/// Fuse the six sub-descriptor distances under the given weight tree.
///
/// Within each modality the sub-weighted distances are averaged, scaled by
/// the modality weight, and the accumulated total is normalized by the sum
/// of modality weights.
pub fn global_distance(a: &DescriptorBundle, b: &DescriptorBundle, weights: &WeightTree) -> f64 {
    let modalities: [(f64, [(f64, &[f64], &[f64]); 2]); 3] = [
        (
            weights.color.weight,
            [
                (weights.color.histogram, &a.color.histogram[..], &b.color.histogram[..]),
                (
                    weights.color.dominant_colors,
                    &a.color.dominant_colors[..],
                    &b.color.dominant_colors[..],
                ),
            ],
        ),
        (
            weights.texture.weight,
            [
                (
                    weights.texture.gabor_filters,
                    &a.texture.gabor_filters[..],
                    &b.texture.gabor_filters[..],
                ),
                (
                    weights.texture.glcm_features,
                    &a.texture.glcm_features[..],
                    &b.texture.glcm_features[..],
                ),
            ],
        ),
        (
            weights.shape.weight,
            [
                (weights.shape.hu_moments, &a.shape.hu_moments[..], &b.shape.hu_moments[..]),
                (
                    weights.shape.shape_descriptors,
                    &a.shape.shape_descriptors[..],
                    &b.shape.shape_descriptors[..],
                ),
            ],
        ),
    ];

    let mut total = 0.0;
    let mut total_weight = 0.0;
    for (modality_weight, subs) in modalities {
        let mean: f64 = subs
            .iter()
            .map(|(sub_weight, va, vb)| sub_weight * blended_distance(va, vb))
            .sum::<f64>()
            / subs.len() as f64;
        total += modality_weight * mean;
        total_weight += modality_weight;
    }
    total / (total_weight + EPS)
}

/// Global distance under the default weight tree.
pub fn distance(a: &DescriptorBundle, b: &DescriptorBundle) -> f64 {
    global_distance(a, b, &WeightTree::default())
}

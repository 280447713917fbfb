//! Color features: per-channel histograms and k-means dominant colors.

use image::RgbImage;
use rand::Rng;

use cbir_core::types::{ColorFeatures, COLOR_HISTOGRAM_LEN, DOMINANT_COLORS_LEN};

const K: usize = 3;
const MAX_ITERS: usize = 10;
/// Lloyd's stops once the total center movement falls below this.
const SHIFT_EPS: f64 = 1.0;
const HIST_EPS: f64 = 1e-10;

pub fn color_features(rgb: &RgbImage) -> ColorFeatures {
    ColorFeatures {
        histogram: channel_histograms(rgb),
        dominant_colors: dominant_colors(rgb),
    }
}

/// 256-bin histogram per channel, each channel normalized by its own sum.
fn channel_histograms(rgb: &RgbImage) -> Vec<f64> {
    let mut counts = [[0u32; 256]; 3];
    for px in rgb.pixels() {
        for c in 0..3 {
            counts[c][px[c] as usize] += 1;
        }
    }
    let mut out = Vec::with_capacity(COLOR_HISTOGRAM_LEN);
    for channel in &counts {
        let total: f64 = channel.iter().map(|&c| f64::from(c)).sum();
        out.extend(channel.iter().map(|&c| f64::from(c) / (total + HIST_EPS)));
    }
    out
}

/// K-means over all pixels in channel space: the 3 cluster centers
/// flattened, followed by each cluster's occupancy fraction.
///
/// Randomly seeded; results are stable only up to clustering tolerance.
fn dominant_colors(rgb: &RgbImage) -> Vec<f64> {
    let points: Vec<[f64; 3]> = rgb
        .pixels()
        .map(|p| [f64::from(p[0]), f64::from(p[1]), f64::from(p[2])])
        .collect();
    if points.is_empty() {
        return vec![0.0; DOMINANT_COLORS_LEN];
    }

    let (centers, assignments) = lloyd(&points, K);

    let mut out = Vec::with_capacity(DOMINANT_COLORS_LEN);
    for center in &centers {
        out.extend_from_slice(center);
    }
    let n = points.len() as f64;
    for cluster in 0..K {
        let members = assignments.iter().filter(|&&a| a == cluster).count();
        out.push(members as f64 / n);
    }
    out
}

fn lloyd(points: &[[f64; 3]], k: usize) -> (Vec<[f64; 3]>, Vec<usize>) {
    let mut rng = rand::thread_rng();
    let mut centers = seed_centers(points, k, &mut rng);
    let mut assignments = vec![0usize; points.len()];

    for _ in 0..MAX_ITERS {
        for (i, p) in points.iter().enumerate() {
            assignments[i] = nearest_center(p, &centers);
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (p, &a) in points.iter().zip(&assignments) {
            counts[a] += 1;
            for d in 0..3 {
                sums[a][d] += p[d];
            }
        }

        let mut shift = 0.0;
        for cluster in 0..k {
            let new_center = if counts[cluster] > 0 {
                let n = counts[cluster] as f64;
                [sums[cluster][0] / n, sums[cluster][1] / n, sums[cluster][2] / n]
            } else {
                // Empty cluster: reseed from a random pixel.
                points[rng.gen_range(0..points.len())]
            };
            shift += squared_distance(&new_center, &centers[cluster]).sqrt();
            centers[cluster] = new_center;
        }
        if shift < SHIFT_EPS {
            break;
        }
    }

    for (i, p) in points.iter().enumerate() {
        assignments[i] = nearest_center(p, &centers);
    }
    (centers, assignments)
}

fn seed_centers<R: Rng>(points: &[[f64; 3]], k: usize, rng: &mut R) -> Vec<[f64; 3]> {
    let mut picked: Vec<usize> = Vec::with_capacity(k);
    // Distinct indices where the image has enough pixels; duplicates are
    // tolerated for tiny inputs and resolved by the empty-cluster reseed.
    let mut guard = 0;
    while picked.len() < k {
        let idx = rng.gen_range(0..points.len());
        guard += 1;
        if !picked.contains(&idx) || guard > 16 * k {
            picked.push(idx);
        }
    }
    picked.into_iter().map(|i| points[i]).collect()
}

fn nearest_center(p: &[f64; 3], centers: &[[f64; 3]]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d = squared_distance(p, c);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

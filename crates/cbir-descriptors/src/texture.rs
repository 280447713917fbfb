//! Texture features: a 4-orientation Gabor filter bank and gray-level
//! co-occurrence statistics.

use std::f64::consts::PI;
use std::time::Instant;

use image::GrayImage;
use rayon::prelude::*;
use tracing::warn;

use cbir_core::types::{TextureFeatures, GABOR_FILTERS_LEN, GLCM_FEATURES_LEN};

const KERNEL_RADIUS: i32 = 10; // 21x21 kernel
const SIGMA: f64 = 8.0;
const LAMBDA: f64 = 10.0;
const GAMMA: f64 = 0.5;
const LEVELS: usize = 256;
const GLCM_EPS: f64 = 1e-10;

pub fn texture_features(gray: &GrayImage) -> TextureFeatures {
    TextureFeatures {
        gabor_filters: gabor_responses(gray),
        glcm_features: glcm_features(gray),
    }
}

/// Mean filtered intensity for orientations 0°, 45°, 90°, 135°.
///
/// The filter output is saturated to [0, 255] before averaging, matching an
/// 8-bit filter destination.
fn gabor_responses(gray: &GrayImage) -> Vec<f64> {
    let (w, h) = (gray.width() as i32, gray.height() as i32);
    let mut responses = Vec::with_capacity(GABOR_FILTERS_LEN);
    if w == 0 || h == 0 {
        return vec![0.0; GABOR_FILTERS_LEN];
    }

    for orientation in 0..GABOR_FILTERS_LEN {
        let theta = orientation as f64 / 4.0 * PI;
        let kernel = gabor_kernel(theta);

        // Rows are independent; filter them in parallel.
        let sum: f64 = (0..h)
            .into_par_iter()
            .map(|y| {
                let mut row_sum = 0.0;
                for x in 0..w {
                    let mut acc = 0.0;
                    for ky in -KERNEL_RADIUS..=KERNEL_RADIUS {
                        for kx in -KERNEL_RADIUS..=KERNEL_RADIUS {
                            let sx = reflect(x + kx, w);
                            let sy = reflect(y + ky, h);
                            let weight = kernel[((ky + KERNEL_RADIUS) * (2 * KERNEL_RADIUS + 1)
                                + (kx + KERNEL_RADIUS))
                                as usize];
                            acc += weight * f64::from(gray.get_pixel(sx as u32, sy as u32)[0]);
                        }
                    }
                    row_sum += acc.round().clamp(0.0, 255.0);
                }
                row_sum
            })
            .sum();

        responses.push(sum / f64::from(w * h));
    }
    responses
}

/// Real Gabor kernel, phase 0:
/// `exp(-(x'^2 + g^2 y'^2) / (2 s^2)) * cos(2 pi x' / l)` with
/// `x' = x cos t + y sin t`, `y' = -x sin t + y cos t`.
fn gabor_kernel(theta: f64) -> Vec<f64> {
    let side = (2 * KERNEL_RADIUS + 1) as usize;
    let mut kernel = vec![0.0; side * side];
    let (sin_t, cos_t) = theta.sin_cos();
    for y in -KERNEL_RADIUS..=KERNEL_RADIUS {
        for x in -KERNEL_RADIUS..=KERNEL_RADIUS {
            let (xf, yf) = (f64::from(x), f64::from(y));
            let xr = xf * cos_t + yf * sin_t;
            let yr = -xf * sin_t + yf * cos_t;
            let envelope = (-(xr * xr + GAMMA * GAMMA * yr * yr) / (2.0 * SIGMA * SIGMA)).exp();
            let carrier = (2.0 * PI * xr / LAMBDA).cos();
            kernel[((y + KERNEL_RADIUS) * (2 * KERNEL_RADIUS + 1) + (x + KERNEL_RADIUS)) as usize] =
                envelope * carrier;
        }
    }
    kernel
}

/// Reflect an out-of-range index back into [0, n) without repeating the
/// border sample (BORDER_REFLECT_101).
fn reflect(i: i32, n: i32) -> i32 {
    if n == 1 {
        return 0;
    }
    let mut i = i;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * (n - 1) - i;
        }
    }
    i
}

/// Unit pixel offsets for co-occurrence angles 0°, 45°, 90°, 135°.
const GLCM_OFFSETS: [(i32, i32); 4] = [(1, 0), (1, 1), (0, 1), (-1, 1)];

/// Contrast, correlation, and energy of the normalized 256x256
/// co-occurrence matrix at each angle.
///
/// Counts are accumulated directly into one table per angle; the full
/// reduction runs once over the 65536 cells.
fn glcm_features(gray: &GrayImage) -> Vec<f64> {
    let (w, h) = (gray.width() as i32, gray.height() as i32);
    let mut features = Vec::with_capacity(GLCM_FEATURES_LEN);
    let started = Instant::now();

    for (dx, dy) in GLCM_OFFSETS {
        let mut counts = vec![0u64; LEVELS * LEVELS];
        for y in 0..h {
            let ny = y + dy;
            if ny < 0 || ny >= h {
                continue;
            }
            for x in 0..w {
                let nx = x + dx;
                if nx < 0 || nx >= w {
                    continue;
                }
                let i = gray.get_pixel(x as u32, y as u32)[0] as usize;
                let j = gray.get_pixel(nx as u32, ny as u32)[0] as usize;
                counts[i * LEVELS + j] += 1;
            }
        }

        let total: f64 = counts.iter().map(|&c| c as f64).sum();
        let norm = total + GLCM_EPS;

        let mut contrast = 0.0;
        let mut correlation = 0.0;
        let mut energy = 0.0;
        for i in 0..LEVELS {
            for j in 0..LEVELS {
                let p = counts[i * LEVELS + j] as f64 / norm;
                if p == 0.0 {
                    continue;
                }
                let (fi, fj) = (i as f64, j as f64);
                contrast += (fi - fj) * (fi - fj) * p;
                correlation += fi * fj * p;
                energy += p * p;
            }
        }
        features.push(contrast);
        features.push(correlation);
        features.push(energy);
    }

    if started.elapsed().as_millis() > 500 {
        warn!(elapsed_ms = started.elapsed().as_millis() as u64, "slow co-occurrence pass");
    }
    features
}

//! Graph-based semi-supervised label spreading over an RBF affinity.
//!
//! Labels live in {-1, 0, +1} with 0 meaning unlabeled. The spread labels
//! are clamped back toward the supplied ones each iteration by the factor
//! `alpha`; the fixed point's row-normalized second column is the
//! positive-class probability.

use ndarray::{Array2, Axis};

use cbir_core::error::{Error, Result};

pub const RBF_GAMMA: f64 = 20.0;
/// Clamping factor: share of each iteration taken from the graph rather
/// than the supplied labels.
pub const ALPHA: f64 = 0.8;
const MAX_ITER: usize = 30;
const TOL: f64 = 1e-3;

#[derive(Debug)]
pub struct LabelSpreading {
    gamma: f64,
    alpha: f64,
}

impl Default for LabelSpreading {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelSpreading {
    pub fn new() -> Self {
        Self { gamma: RBF_GAMMA, alpha: ALPHA }
    }

    /// Fit on the standardized feature matrix against `labels` and return
    /// P(+1) for every row.
    pub fn fit_predict_positive(
        &self,
        features: &Array2<f64>,
        labels: &[f64],
    ) -> Result<Vec<f64>> {
        let n = features.nrows();
        if n == 0 || labels.len() != n {
            return Err(Error::DegenerateInput(format!(
                "label vector length {} does not match {} corpus rows",
                labels.len(),
                n
            )));
        }
        if !labels.iter().any(|&l| l != 0.0) {
            return Err(Error::DegenerateInput(
                "label propagation needs at least one labeled point".to_string(),
            ));
        }

        // RBF affinity with a zero diagonal.
        let mut affinity = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let d2: f64 = features
                    .row(i)
                    .iter()
                    .zip(features.row(j))
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                let w = (-self.gamma * d2).exp();
                affinity[[i, j]] = w;
                affinity[[j, i]] = w;
            }
        }

        // Symmetric normalization S = D^-1/2 W D^-1/2.
        let inv_sqrt_degree: Vec<f64> = affinity
            .sum_axis(Axis(1))
            .iter()
            .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
            .collect();
        let mut graph = affinity;
        for i in 0..n {
            for j in 0..n {
                graph[[i, j]] *= inv_sqrt_degree[i] * inv_sqrt_degree[j];
            }
        }

        // One-hot seed: column 0 = class -1, column 1 = class +1.
        let mut seed = Array2::<f64>::zeros((n, 2));
        for (i, &label) in labels.iter().enumerate() {
            if label < 0.0 {
                seed[[i, 0]] = 1.0;
            } else if label > 0.0 {
                seed[[i, 1]] = 1.0;
            }
        }

        let mut spread = seed.clone();
        for _ in 0..MAX_ITER {
            let next = self.alpha * graph.dot(&spread) + (1.0 - self.alpha) * &seed;
            let delta: f64 = (&next - &spread).mapv(f64::abs).sum();
            spread = next;
            if delta < TOL {
                break;
            }
        }

        let probabilities = spread
            .axis_iter(Axis(0))
            .map(|row| {
                let total = row[0] + row[1];
                // An isolated unlabeled point receives no mass from the
                // graph; call it undecided.
                if total > 0.0 { row[1] / total } else { 0.5 }
            })
            .collect();
        Ok(probabilities)
    }
}

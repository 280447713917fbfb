//! Relevance-feedback search session.
//!
//! Owns the adaptive weight tree, the sticky label vector, the fitted
//! scaler, and the standardized corpus feature matrix. Labels and weights
//! persist across queries; every mutation is staged on clones and committed
//! only once the whole query has succeeded, so a failed attempt never
//! leaves partial state behind.

use std::cmp::Ordering;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info};

use cbir_core::error::{Error, Result};
use cbir_core::traits::{Extractor, SearchEngine};
use cbir_core::types::{Feedback, SearchHit, WeightTree, FEATURE_DIM};
use cbir_descriptors::DescriptorExtractor;
use cbir_distance::global_distance;
use cbir_index::CorpusIndex;

use crate::propagation::LabelSpreading;
use crate::scaler::StandardScaler;

/// Feedback strength parameter.
const LC: f64 = 0.5;
/// Score fusion once feedback has been applied this query.
const DISTANCE_SHARE: f64 = 0.7;
const PROBABILITY_SHARE: f64 = 0.3;

#[derive(Debug)]
pub struct FeedbackSession {
    index: CorpusIndex,
    extractor: DescriptorExtractor,
    weights: WeightTree,
    labels: Vec<f64>,
    scaler: StandardScaler,
    features: Array2<f64>,
    model: LabelSpreading,
}

impl FeedbackSession {
    /// Prepare the session over a loaded corpus: flatten every bundle into
    /// the feature matrix, repair it, fit the scaler, standardize.
    pub fn new(index: CorpusIndex) -> Result<Self> {
        let (scaler, features) = prepare_features(&index)?;
        let labels = vec![0.0; index.len()];
        info!(corpus = index.len(), "feedback session ready");
        Ok(Self {
            index,
            extractor: DescriptorExtractor,
            weights: WeightTree::adaptive_start(),
            labels,
            scaler,
            features,
            model: LabelSpreading::new(),
        })
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    pub fn weights(&self) -> &WeightTree {
        &self.weights
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Rank the corpus for a query image, optionally folding in relevance
    /// feedback first. Returns the `top_k` best hits, ascending by score.
    pub fn search(
        &mut self,
        payload: &[u8],
        top_k: usize,
        feedback: Option<&Feedback>,
    ) -> Result<Vec<SearchHit>> {
        let mut staged: Option<(Vec<f64>, WeightTree, Vec<f64>)> = None;

        if let Some(fb) = feedback.filter(|f| !f.is_empty()) {
            let relevant = self.resolve(&fb.relevant)?;
            let non_relevant = self.resolve(&fb.non_relevant)?;

            let mut labels = self.labels.clone();
            for &i in &relevant {
                labels[i] = 1.0;
            }
            for &i in &non_relevant {
                labels[i] = -1.0;
            }

            let mut weights = self.weights.clone();
            for &i in &relevant {
                weights.scale_sub_weights(1.0 - (LC * labels[i]).min(1.0));
            }
            for &i in &non_relevant {
                weights.scale_sub_weights(1.0 + (LC * labels[i]).max(1.0));
            }
            debug_assert!(weights.is_finite_positive());

            let probabilities = self.model.fit_predict_positive(&self.features, &labels)?;
            staged = Some((labels, weights, probabilities));
        }

        let query = self.extractor.extract_bytes(payload)?;

        let weights = staged.as_ref().map_or(&self.weights, |(_, w, _)| w);
        let distances: Vec<f64> = self
            .index
            .bundles()
            .par_iter()
            .map(|bundle| global_distance(&query, bundle, weights))
            .collect();

        let mut hits: Vec<SearchHit> = self
            .index
            .ids()
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let score = match &staged {
                    Some((_, _, probabilities)) => {
                        DISTANCE_SHARE * distances[i] + PROBABILITY_SHARE * probabilities[i]
                    }
                    None => distances[i],
                };
                SearchHit { id: id.clone(), score }
            })
            .collect();
        // Stable sort: ties keep corpus order.
        hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);

        if let Some((labels, weights, _)) = staged {
            self.labels = labels;
            self.weights = weights;
            debug!("committed feedback round");
        }
        Ok(hits)
    }

    /// Read-only ranking under the current weights, no feedback. Callers
    /// holding shared references may run this concurrently.
    pub fn rank(&self, payload: &[u8], top_k: usize) -> Result<Vec<SearchHit>> {
        let query = self.extractor.extract_bytes(payload)?;
        let mut hits: Vec<SearchHit> = self
            .index
            .bundles()
            .par_iter()
            .zip(self.index.ids())
            .map(|(bundle, id)| SearchHit {
                id: id.clone(),
                score: global_distance(&query, bundle, &self.weights),
            })
            .collect();
        hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn resolve(&self, ids: &[String]) -> Result<Vec<usize>> {
        ids.iter()
            .map(|id| {
                self.index
                    .position(id)
                    .ok_or_else(|| Error::NotFound(id.clone()))
            })
            .collect()
    }
}

impl SearchEngine for FeedbackSession {
    fn search(
        &mut self,
        payload: &[u8],
        top_k: usize,
        feedback: Option<&Feedback>,
    ) -> Result<Vec<SearchHit>> {
        Self::search(self, payload, top_k, feedback)
    }
}

fn prepare_features(index: &CorpusIndex) -> Result<(StandardScaler, Array2<f64>)> {
    if index.is_empty() {
        return Err(Error::DegenerateInput("corpus is empty".to_string()));
    }

    let n = index.len();
    let mut matrix = Array2::<f64>::zeros((n, FEATURE_DIM));
    for (i, bundle) in index.bundles().iter().enumerate() {
        let flat = bundle.flatten();
        if flat.len() != FEATURE_DIM {
            return Err(Error::DegenerateInput(format!(
                "descriptor bundle for {} has {} features, expected {}",
                index.ids()[i],
                flat.len(),
                FEATURE_DIM
            )));
        }
        for (j, v) in flat.into_iter().enumerate() {
            matrix[[i, j]] = v;
        }
    }

    repair_matrix(&mut matrix);

    if matrix.iter().all(|&v| v == 0.0) {
        return Err(Error::DegenerateInput(
            "feature matrix is all zeros".to_string(),
        ));
    }

    let scaler = StandardScaler::fit(&matrix);
    let standardized = scaler.transform(&matrix);
    Ok((scaler, standardized))
}

/// NaN cells take the column mean of the finite values; infinities clip to
/// the column's finite extremes. A column with no finite value collapses
/// to zero.
fn repair_matrix(matrix: &mut Array2<f64>) {
    let (rows, cols) = matrix.dim();
    for j in 0..cols {
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for i in 0..rows {
            let v = matrix[[i, j]];
            if v.is_finite() {
                sum += v;
                count += 1;
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        let mean = if count > 0 { sum / count as f64 } else { 0.0 };
        let (lo, hi) = if count > 0 { (lo, hi) } else { (0.0, 0.0) };
        for i in 0..rows {
            let v = matrix[[i, j]];
            if v.is_nan() {
                matrix[[i, j]] = mean;
            } else if v == f64::INFINITY {
                matrix[[i, j]] = hi;
            } else if v == f64::NEG_INFINITY {
                matrix[[i, j]] = lo;
            }
        }
    }
}

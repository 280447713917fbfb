//! Feature-wise standardization, fitted once over the corpus matrix.

use ndarray::{Array1, Array2, Axis};

#[derive(Debug)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl StandardScaler {
    /// Column means and population standard deviations. Zero-variance
    /// columns divide by 1 so constant features pass through centered.
    pub fn fit(matrix: &Array2<f64>) -> Self {
        let mean = matrix
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(matrix.ncols()));
        let mut std = matrix.std_axis(Axis(0), 0.0);
        std.mapv_inplace(|s| if s == 0.0 { 1.0 } else { s });
        Self { mean, std }
    }

    pub fn transform(&self, matrix: &Array2<f64>) -> Array2<f64> {
        (matrix - &self.mean) / &self.std
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter())
            .zip(self.std.iter())
            .map(|((x, m), s)| (x - m) / s)
            .collect()
    }
}

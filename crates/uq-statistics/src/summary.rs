//! Regression quality summary for extracted predictions.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionSummary {
    /// Mean squared error
    pub mse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Pearson correlation between observed and predicted values
    pub pearson: Option<f64>,
}

impl RegressionSummary {
    /// `None` for empty or mismatched inputs
    pub fn compute(observed: &[f64], predicted: &[f64]) -> Option<Self> {
        if observed.is_empty() || observed.len() != predicted.len() {
            return None;
        }
        let n = observed.len() as f64;

        let residuals: Vec<f64> = observed.iter().zip(predicted).map(|(y, p)| y - p).collect();
        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let mse = ss_res / n;
        let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n;

        let mean_observed = observed.iter().mean();
        let ss_tot: f64 = observed.iter().map(|y| (y - mean_observed).powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        let pearson = if observed.len() > 1 {
            let sd_product = observed.iter().std_dev() * predicted.iter().std_dev();
            let cov = observed.iter().covariance(predicted.iter());
            (sd_product > 0.0).then(|| cov / sd_product)
        } else {
            None
        };

        Some(Self {
            mse,
            mae,
            r2,
            pearson,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_predictions() {
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let summary = RegressionSummary::compute(&y, &y).unwrap();
        assert_relative_eq!(summary.mse, 0.0);
        assert_relative_eq!(summary.mae, 0.0);
        assert_relative_eq!(summary.r2, 1.0);
        assert_relative_eq!(summary.pearson.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_known_errors() {
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let p = vec![2.0, 2.0, 2.0, 6.0];
        let summary = RegressionSummary::compute(&y, &p).unwrap();
        // residuals -1, 0, 1, -2
        assert_relative_eq!(summary.mse, 1.5);
        assert_relative_eq!(summary.mae, 1.0);
        // ss_tot = 5, ss_res = 6
        assert_relative_eq!(summary.r2, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_prediction_has_no_correlation() {
        let summary = RegressionSummary::compute(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]).unwrap();
        assert!(summary.pearson.is_none());
    }

    #[test]
    fn test_mismatched_inputs() {
        assert!(RegressionSummary::compute(&[1.0], &[]).is_none());
        assert!(RegressionSummary::compute(&[], &[]).is_none());
    }
}

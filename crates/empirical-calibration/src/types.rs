//! Shared data model for empirical calibration.

use serde::{Deserialize, Serialize};

/// One inference result in the uniform shape every statistics extractor yields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionSample {
    /// Observed target value
    pub true_value: f64,
    /// Predicted mean
    pub predicted_mean: f64,
    /// Self-reported uncertainty used for binning
    pub predicted_sigma: f64,
    /// Spread of the predictive distribution, kept for reporting
    pub predicted_std: f64,
    /// |true_value - predicted_mean|
    pub abs_error: f64,
}

impl PredictionSample {
    pub fn new(true_value: f64, predicted_mean: f64, predicted_sigma: f64, predicted_std: f64) -> Self {
        Self {
            true_value,
            predicted_mean,
            predicted_sigma,
            predicted_std,
            abs_error: (true_value - predicted_mean).abs(),
        }
    }
}

/// 10th/90th percentile predictions produced by quantile models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileBand {
    pub lower_10p: f64,
    pub upper_90p: f64,
}

/// Statistics for one contiguous, sigma-ordered group of calibration samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigmaBin {
    pub min_sigma: f64,
    pub max_sigma: f64,
    pub mean_sigma: f64,
    /// Coverage percentile of the absolute error within the bin.
    ///
    /// Estimated with the median-unbiased R-8 quantile (statrs
    /// `OrderStatistics::quantile`), not the linear R-7 rule that numpy's
    /// `percentile` uses by default, so small bins give slightly different
    /// values than a numpy-based tool.
    pub error_threshold: f64,
    /// Standard error of the bin's absolute error (sampling noise estimate)
    pub smoothing_error: f64,
    /// Number of samples in the bin
    pub count: usize,
}

/// Raw and smoothed per-bin error thresholds, aligned by bin index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub bins: Vec<SigmaBin>,
    pub error_threshold_smooth: Vec<f64>,
}

impl CalibrationCurve {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn mean_sigma(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.mean_sigma).collect()
    }

    pub fn error_thresholds(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.error_threshold).collect()
    }
}

/// Inclusive bin-index range over which the smoothed curve is monotone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonotonicTrustRegion {
    pub start_index: usize,
    pub end_index: usize,
    /// mean_sigma at `start_index`
    pub min_sigma_auto: f64,
    /// mean_sigma at `end_index`
    pub max_sigma_auto: f64,
}

impl MonotonicTrustRegion {
    /// Number of bins covered by the region
    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn contains(&self, sigma: f64) -> bool {
        sigma >= self.min_sigma_auto && sigma <= self.max_sigma_auto
    }
}

//! Empirical Calibration by Binning
//!
//! Learns, on the calibration subset, which absolute error actually occurs at
//! each level of predicted sigma:
//!
//! 1. sort calibration samples by sigma and cut them into equal-count bins
//! 2. per bin, take the coverage percentile of the absolute error
//! 3. smooth the resulting threshold curve
//! 4. keep the longest run of bins where the smoothed curve is non-decreasing
//!    (higher sigma must never tolerate a smaller error)
//! 5. fit a monotone interpolant over that run

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};

use crate::error::{CalibrationError, Result};
use crate::interpolant::{CalibrationInterpolant, ControlPoint};
use crate::smoothing::{moving_average, DEFAULT_SMOOTHING_WINDOW};
use crate::types::{CalibrationCurve, MonotonicTrustRegion, PredictionSample, SigmaBin};

/// Default nominal coverage, in percent
pub const DEFAULT_COVERAGE_PERCENTILE: f64 = 95.0;
/// Bins with fewer samples than this are too sparse for a percentile estimate
pub const DEFAULT_MIN_BIN_SAMPLES: usize = 5;
/// Relative slack for smoothed-threshold decreases caused by rounding
const MONOTONE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinningConfig {
    /// Number of equal-count sigma bins
    pub num_bins: usize,
    /// Target coverage in percent, e.g. 95.0
    pub coverage_percentile: f64,
    /// Odd moving-average width applied to the threshold curve
    pub smoothing_window: usize,
    /// Density threshold below which bins are reported as degenerate
    pub min_bin_samples: usize,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            num_bins: 31,
            coverage_percentile: DEFAULT_COVERAGE_PERCENTILE,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            min_bin_samples: DEFAULT_MIN_BIN_SAMPLES,
        }
    }
}

impl BinningConfig {
    pub fn new(num_bins: usize, coverage_percentile: f64) -> Self {
        Self {
            num_bins,
            coverage_percentile,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.num_bins < 2 {
            return Err(CalibrationError::InvalidParameter(format!(
                "need at least 2 bins, got {}",
                self.num_bins
            )));
        }
        if !(self.coverage_percentile > 0.0 && self.coverage_percentile <= 100.0) {
            return Err(CalibrationError::InvalidParameter(format!(
                "coverage percentile must lie in (0, 100], got {}",
                self.coverage_percentile
            )));
        }
        if self.smoothing_window == 0 || self.smoothing_window % 2 == 0 {
            return Err(CalibrationError::InvalidParameter(format!(
                "smoothing window must be a positive odd number, got {}",
                self.smoothing_window
            )));
        }
        Ok(())
    }
}

/// Result of a binning calibration run
#[derive(Debug, Clone)]
pub struct EmpiricalCalibration {
    pub curve: CalibrationCurve,
    pub trust_region: MonotonicTrustRegion,
    pub interpolant: CalibrationInterpolant,
    pub coverage_percentile: f64,
}

impl EmpiricalCalibration {
    pub fn min_sigma_auto(&self) -> f64 {
        self.trust_region.min_sigma_auto
    }

    pub fn max_sigma_auto(&self) -> f64 {
        self.trust_region.max_sigma_auto
    }
}

#[derive(Debug, Clone, Default)]
pub struct BinningCalibrator {
    config: BinningConfig,
}

impl BinningCalibrator {
    pub fn new(config: BinningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BinningConfig {
        &self.config
    }

    /// Run the full binning calibration over the calibration subset
    pub fn compute<'a, I>(&self, calibration_subset: I) -> Result<EmpiricalCalibration>
    where
        I: IntoIterator<Item = &'a PredictionSample>,
    {
        let samples: Vec<&PredictionSample> = calibration_subset.into_iter().collect();

        let bins = self.compute_bins(&samples)?;
        let thresholds: Vec<f64> = bins.iter().map(|b| b.error_threshold).collect();
        let smooth = self.smooth(&thresholds)?;
        let curve = CalibrationCurve {
            bins,
            error_threshold_smooth: smooth,
        };

        let trust_region = monotonic_region(&curve.mean_sigma(), &curve.error_threshold_smooth)?;

        // Running maximum removes rounding dips so the knots never decrease
        let mut floor = f64::NEG_INFINITY;
        let points: Vec<ControlPoint> = (trust_region.start_index..=trust_region.end_index)
            .map(|i| {
                floor = floor.max(curve.error_threshold_smooth[i]);
                ControlPoint {
                    sigma: curve.bins[i].mean_sigma,
                    threshold: floor,
                }
            })
            .collect();
        let interpolant = CalibrationInterpolant::from_points(points)?;

        tracing::info!(
            bins = curve.len(),
            coverage = self.config.coverage_percentile,
            start_index = trust_region.start_index,
            end_index = trust_region.end_index,
            min_sigma_auto = trust_region.min_sigma_auto,
            max_sigma_auto = trust_region.max_sigma_auto,
            "Computed empirical calibration by binning"
        );
        if trust_region.len() < curve.len() {
            tracing::debug!(
                dropped = curve.len() - trust_region.len(),
                "Bins outside the monotonic region discarded"
            );
        }

        Ok(EmpiricalCalibration {
            curve,
            trust_region,
            interpolant,
            coverage_percentile: self.config.coverage_percentile,
        })
    }

    /// Sort by sigma, cut into equal-count bins and measure each bin.
    ///
    /// Every bin holds `n / num_bins` samples; the last one also takes the
    /// remainder.
    pub fn compute_bins(&self, samples: &[&PredictionSample]) -> Result<Vec<SigmaBin>> {
        self.config.validate()?;

        if let Some(bad) = samples
            .iter()
            .find(|s| !s.predicted_sigma.is_finite() || !s.abs_error.is_finite())
        {
            return Err(CalibrationError::InvalidData(format!(
                "non-finite calibration sample (sigma {}, abs error {})",
                bad.predicted_sigma, bad.abs_error
            )));
        }

        let num_bins = self.config.num_bins;
        let n = samples.len();
        if n < num_bins {
            return Err(CalibrationError::InsufficientData(format!(
                "{} calibration samples for {} bins",
                n, num_bins
            )));
        }

        let bin_size = n / num_bins;
        if bin_size < self.config.min_bin_samples {
            return Err(CalibrationError::DegenerateBins {
                bin_size,
                min_samples: self.config.min_bin_samples,
            });
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.predicted_sigma.total_cmp(&b.predicted_sigma));

        let tau = self.config.coverage_percentile / 100.0;
        let bins = (0..num_bins)
            .map(|b| {
                let start = b * bin_size;
                let end = if b == num_bins - 1 { n } else { start + bin_size };
                summarize_bin(&sorted[start..end], tau)
            })
            .collect::<Vec<_>>();

        for (i, bin) in bins.iter().enumerate() {
            tracing::debug!(
                bin = i,
                count = bin.count,
                mean_sigma = bin.mean_sigma,
                error_threshold = bin.error_threshold,
                "sigma bin"
            );
        }

        Ok(bins)
    }

    /// Smoothed counterpart of the raw threshold curve
    pub fn smooth(&self, error_thresholds: &[f64]) -> Result<Vec<f64>> {
        moving_average(error_thresholds, self.config.smoothing_window)
    }
}

fn summarize_bin(group: &[&PredictionSample], tau: f64) -> SigmaBin {
    let count = group.len();
    let sigmas: Vec<f64> = group.iter().map(|s| s.predicted_sigma).collect();
    let errors: Vec<f64> = group.iter().map(|s| s.abs_error).collect();

    let smoothing_error = if count > 1 {
        errors.iter().std_dev() / (count as f64).sqrt()
    } else {
        0.0
    };
    // R-8 quantile
    let error_threshold = Data::new(errors).quantile(tau);

    SigmaBin {
        min_sigma: sigmas[0],
        max_sigma: sigmas[count - 1],
        mean_sigma: sigmas.iter().mean(),
        error_threshold,
        smoothing_error,
        count,
    }
}

/// Longest contiguous run where the smoothed curve is non-decreasing and the
/// bin centers strictly increase. The first run wins ties. Decreases within
/// rounding noise of the previous value do not break a run.
pub fn monotonic_region(mean_sigma: &[f64], smooth: &[f64]) -> Result<MonotonicTrustRegion> {
    if mean_sigma.len() != smooth.len() {
        return Err(CalibrationError::InvalidParameter(format!(
            "{} bin centers for {} smoothed thresholds",
            mean_sigma.len(),
            smooth.len()
        )));
    }
    if smooth.is_empty() {
        return Err(CalibrationError::DegenerateTrustRegion { length: 0 });
    }

    let mut best_start = 0;
    let mut best_len = 1;
    let mut run_start = 0;
    for i in 1..smooth.len() {
        let slack = MONOTONE_TOLERANCE * smooth[i - 1].abs().max(1.0);
        let monotone = smooth[i] >= smooth[i - 1] - slack && mean_sigma[i] > mean_sigma[i - 1];
        if !monotone {
            run_start = i;
        }
        let run_len = i - run_start + 1;
        if run_len > best_len {
            best_start = run_start;
            best_len = run_len;
        }
    }

    if best_len < 2 {
        return Err(CalibrationError::DegenerateTrustRegion { length: best_len });
    }

    let end = best_start + best_len - 1;
    Ok(MonotonicTrustRegion {
        start_index: best_start,
        end_index: end,
        min_sigma_auto: mean_sigma[best_start],
        max_sigma_auto: mean_sigma[end],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// sigma = i / n, error = sigma scaled by a deterministic wobble in [0.9, 1.1]
    fn linear_samples(n: usize) -> Vec<PredictionSample> {
        (0..n)
            .map(|i| {
                let sigma = i as f64 / n as f64;
                let wobble = 0.9 + 0.2 * ((i * 7919) % 101) as f64 / 100.0;
                PredictionSample::new(sigma * wobble, 0.0, sigma, sigma)
            })
            .collect()
    }

    #[test]
    fn test_threshold_uses_median_unbiased_quantile() {
        // first bin errors 1..=10; R-8 at 0.9 gives 9 + 0.6333, linear R-7 would give 9.1
        let data: Vec<PredictionSample> = (1..=20)
            .map(|i| PredictionSample::new(i as f64, 0.0, i as f64 / 10.0, 0.0))
            .collect();
        let refs: Vec<&PredictionSample> = data.iter().collect();
        let calibrator = BinningCalibrator::new(BinningConfig::new(2, 90.0));

        let bins = calibrator.compute_bins(&refs).unwrap();
        assert_relative_eq!(bins[0].error_threshold, 9.0 + 19.0 / 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bins_partition_sorted_samples() {
        let data = linear_samples(103);
        let refs: Vec<&PredictionSample> = data.iter().rev().collect();
        let calibrator = BinningCalibrator::new(BinningConfig::new(10, 95.0));

        let bins = calibrator.compute_bins(&refs).unwrap();
        assert_eq!(bins.len(), 10);
        assert!(bins[..9].iter().all(|b| b.count == 10));
        assert_eq!(bins[9].count, 13);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 103);

        for pair in bins.windows(2) {
            assert!(pair[0].mean_sigma < pair[1].mean_sigma);
            assert!(pair[0].max_sigma <= pair[1].min_sigma);
        }
        for bin in &bins {
            assert!(bin.min_sigma <= bin.mean_sigma && bin.mean_sigma <= bin.max_sigma);
            assert!(bin.smoothing_error >= 0.0);
        }
    }

    #[test]
    fn test_threshold_is_coverage_percentile() {
        // One bin of errors 1..=100 mixed in sigma order; 100th percentile is the max
        let data: Vec<PredictionSample> = (1..=100)
            .map(|i| PredictionSample::new(i as f64, 0.0, 0.5 + (i % 2) as f64, 1.0))
            .collect();
        let refs: Vec<&PredictionSample> = data.iter().collect();

        let mut config = BinningConfig::new(2, 100.0);
        config.min_bin_samples = 1;
        let bins = BinningCalibrator::new(config).compute_bins(&refs).unwrap();
        assert_relative_eq!(bins[0].error_threshold, 100.0);
        assert_relative_eq!(bins[1].error_threshold, 99.0);

        let mut config = BinningConfig::new(2, 50.0);
        config.min_bin_samples = 1;
        let bins = BinningCalibrator::new(config).compute_bins(&refs).unwrap();
        // even errors 2..=100 sit in the sigma 0.5 bin; their median is 51
        assert_relative_eq!(bins[0].error_threshold, 51.0, epsilon = 1e-9);
    }

    #[test]
    fn test_insufficient_samples_for_bins() {
        let data = linear_samples(9);
        let refs: Vec<&PredictionSample> = data.iter().collect();
        let result = BinningCalibrator::new(BinningConfig::new(10, 95.0)).compute_bins(&refs);
        assert!(matches!(result, Err(CalibrationError::InsufficientData(_))));
    }

    #[test]
    fn test_sparse_bins_are_degenerate() {
        let data = linear_samples(40);
        let result = BinningCalibrator::new(BinningConfig::new(10, 95.0)).compute(&data);
        assert!(matches!(
            result,
            Err(CalibrationError::DegenerateBins { bin_size: 4, min_samples: 5 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let data = linear_samples(100);
        for config in [
            BinningConfig::new(1, 95.0),
            BinningConfig::new(10, 0.0),
            BinningConfig::new(10, 101.0),
            BinningConfig {
                smoothing_window: 4,
                ..BinningConfig::new(10, 95.0)
            },
        ] {
            let result = BinningCalibrator::new(config).compute(&data);
            assert!(matches!(result, Err(CalibrationError::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_non_finite_sigma_rejected() {
        let mut data = linear_samples(100);
        data[3].predicted_sigma = f64::NAN;
        let result = BinningCalibrator::new(BinningConfig::new(10, 95.0)).compute(&data);
        assert!(matches!(result, Err(CalibrationError::InvalidData(_))));
    }

    #[test]
    fn test_monotonic_region_picks_longest_run() {
        let sigma = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        let smooth = [1.0, 0.9, 1.0, 1.1, 1.2, 1.2, 0.8, 0.9];
        let region = monotonic_region(&sigma, &smooth).unwrap();
        assert_eq!((region.start_index, region.end_index), (1, 5));
        assert_relative_eq!(region.min_sigma_auto, 0.2);
        assert_relative_eq!(region.max_sigma_auto, 0.6);
    }

    #[test]
    fn test_monotonic_region_first_run_wins_ties() {
        let sigma = [0.1, 0.2, 0.3, 0.4, 0.5];
        let smooth = [1.0, 2.0, 0.5, 0.6, 0.1];
        let region = monotonic_region(&sigma, &smooth).unwrap();
        assert_eq!((region.start_index, region.end_index), (0, 1));
    }

    #[test]
    fn test_monotonic_region_requires_two_bins() {
        let sigma = [0.1, 0.2, 0.3];
        let smooth = [3.0, 2.0, 1.0];
        assert!(matches!(
            monotonic_region(&sigma, &smooth),
            Err(CalibrationError::DegenerateTrustRegion { length: 1 })
        ));
    }

    #[test]
    fn test_compute_on_increasing_errors_covers_range() {
        let data = linear_samples(600);
        let calibration = BinningCalibrator::new(BinningConfig::new(20, 95.0))
            .compute(&data)
            .unwrap();

        let region = calibration.trust_region;
        assert!(region.len() >= 15);
        let smooth = &calibration.curve.error_threshold_smooth;
        for i in region.start_index..region.end_index {
            assert!(smooth[i] <= smooth[i + 1]);
        }
        let (lo, hi) = calibration.interpolant.domain();
        assert_relative_eq!(lo, calibration.min_sigma_auto());
        assert_relative_eq!(hi, calibration.max_sigma_auto());
    }
}

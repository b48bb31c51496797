//! Applies a fitted calibration to held-out samples.
//!
//! Only samples whose sigma lies inside the trust region are calibrated; the
//! interpolant is never extrapolated.

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::interpolant::CalibrationInterpolant;
use crate::types::PredictionSample;

/// Calibrated subset of the test samples, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedCalibration {
    /// Positions of the retained samples in the input sequence
    pub indices: Vec<usize>,
    /// Sigma of each retained sample
    pub sigmas: Vec<f64>,
    /// Calibrated error bound of each retained sample
    pub predicted_bounds: Vec<f64>,
    /// Observed absolute error of each retained sample
    pub abs_errors: Vec<f64>,
}

impl AppliedCalibration {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when no sample fell inside the trust region
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Select entries of a parallel array (aligned with the applier input)
    pub fn select<T: Clone>(&self, values: &[T]) -> Result<Vec<T>> {
        self.indices
            .iter()
            .map(|&i| {
                values.get(i).cloned().ok_or_else(|| {
                    CalibrationError::InvalidParameter(format!(
                        "parallel array has {} values, calibrated sample index is {}",
                        values.len(),
                        i
                    ))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationApplier;

impl CalibrationApplier {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate the interpolant on every sample with sigma in
    /// `[min_sigma_auto, max_sigma_auto]` (inclusive)
    pub fn apply<'a, I>(
        &self,
        test_subset: I,
        interpolant: &CalibrationInterpolant,
        min_sigma_auto: f64,
        max_sigma_auto: f64,
    ) -> AppliedCalibration
    where
        I: IntoIterator<Item = &'a PredictionSample>,
    {
        let mut applied = AppliedCalibration::default();
        let mut total = 0usize;

        for (index, sample) in test_subset.into_iter().enumerate() {
            total += 1;
            let sigma = sample.predicted_sigma;
            if !(sigma >= min_sigma_auto && sigma <= max_sigma_auto) {
                continue;
            }
            // Limits wider than the interpolant's own domain are clipped to it
            let Some(bound) = interpolant.evaluate(sigma) else {
                continue;
            };

            applied.indices.push(index);
            applied.sigmas.push(sigma);
            applied.predicted_bounds.push(bound);
            applied.abs_errors.push(sample.abs_error);
        }

        if applied.is_empty() {
            tracing::warn!(
                total,
                min_sigma_auto,
                max_sigma_auto,
                "No test sample falls inside the calibrated sigma range"
            );
        } else {
            tracing::info!(
                retained = applied.len(),
                total,
                "Applied calibration to test samples"
            );
        }

        applied
    }
}

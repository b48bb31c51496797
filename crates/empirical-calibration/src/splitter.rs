//! Calibration/Test Split
//!
//! Partitions extracted samples into a calibration subset and a disjoint test
//! subset through one seeded random permutation. Any array computed outside the
//! dataset (predicted std, labels, ...) must be re-indexed through the same
//! permutation before it is paired with either subset; `CalibrationDataset`
//! exposes `permute`, `calibration_values` and `test_values` for that.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{CalibrationError, Result};
use crate::types::PredictionSample;

/// Default share of samples used for calibration
pub const DEFAULT_CAL_FRACTION: f64 = 0.5;
/// Seed used when the caller does not provide one
pub const DEFAULT_SEED: u64 = 7102;

/// Samples plus the stored permutation that defines the two subsets
#[derive(Debug, Clone)]
pub struct CalibrationDataset {
    samples: Vec<PredictionSample>,
    permutation: Vec<usize>,
    num_cal: usize,
}

impl CalibrationDataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_cal(&self) -> usize {
        self.num_cal
    }

    pub fn num_test(&self) -> usize {
        self.samples.len() - self.num_cal
    }

    /// Samples in their original (extraction) order
    pub fn samples(&self) -> &[PredictionSample] {
        &self.samples
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Original indices of the calibration subset, in permuted order
    pub fn calibration_indices(&self) -> &[usize] {
        &self.permutation[..self.num_cal]
    }

    /// Original indices of the test subset, in permuted order
    pub fn test_indices(&self) -> &[usize] {
        &self.permutation[self.num_cal..]
    }

    pub fn calibration_view(&self) -> impl ExactSizeIterator<Item = &PredictionSample> + '_ {
        self.calibration_indices().iter().map(move |&i| &self.samples[i])
    }

    pub fn test_view(&self) -> impl ExactSizeIterator<Item = &PredictionSample> + '_ {
        self.test_indices().iter().map(move |&i| &self.samples[i])
    }

    /// Reorder a parallel array (aligned with the original samples) by the permutation
    pub fn permute<T: Clone>(&self, values: &[T]) -> Result<Vec<T>> {
        if values.len() != self.samples.len() {
            return Err(CalibrationError::InvalidParameter(format!(
                "parallel array has {} values, dataset has {} samples",
                values.len(),
                self.samples.len()
            )));
        }
        Ok(self.permutation.iter().map(|&i| values[i].clone()).collect())
    }

    /// Calibration part of a parallel array
    pub fn calibration_values<T: Clone>(&self, values: &[T]) -> Result<Vec<T>> {
        let mut permuted = self.permute(values)?;
        permuted.truncate(self.num_cal);
        Ok(permuted)
    }

    /// Test part of a parallel array, aligned with `test_view`
    pub fn test_values<T: Clone>(&self, values: &[T]) -> Result<Vec<T>> {
        let permuted = self.permute(values)?;
        Ok(permuted[self.num_cal..].to_vec())
    }
}

/// Seeded splitter; the same seed always yields the same permutation
#[derive(Debug, Clone, Copy)]
pub struct DatasetSplitter {
    cal_fraction: f64,
    seed: u64,
}

impl Default for DatasetSplitter {
    fn default() -> Self {
        Self {
            cal_fraction: DEFAULT_CAL_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

impl DatasetSplitter {
    pub fn new(cal_fraction: f64, seed: u64) -> Result<Self> {
        if !(cal_fraction > 0.0 && cal_fraction < 1.0) {
            return Err(CalibrationError::InvalidParameter(format!(
                "calibration fraction must lie in (0, 1), got {}",
                cal_fraction
            )));
        }
        Ok(Self { cal_fraction, seed })
    }

    pub fn cal_fraction(&self) -> f64 {
        self.cal_fraction
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random permutation of `[0..n)` drawn from a fresh RNG seeded with `seed`
    pub fn permutation(&self, n: usize) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        indices
    }

    pub fn split(&self, samples: Vec<PredictionSample>) -> Result<CalibrationDataset> {
        let n = samples.len();
        let num_cal = (n as f64 * self.cal_fraction).floor() as usize;
        if num_cal == 0 || num_cal == n {
            return Err(CalibrationError::InsufficientData(format!(
                "{} samples cannot be split into non-empty calibration and test subsets",
                n
            )));
        }

        let permutation = self.permutation(n);
        tracing::info!(
            total = n,
            num_cal,
            num_test = n - num_cal,
            seed = self.seed,
            "Split data for empirical calibration"
        );

        Ok(CalibrationDataset {
            samples,
            permutation,
            num_cal,
        })
    }
}

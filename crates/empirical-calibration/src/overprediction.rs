//! Coverage check for applied calibrations.
//!
//! Compares the share of samples whose observed error stays within the
//! calibrated bound against the nominal coverage. A gap beyond tolerance is a
//! calibration-quality warning, never a failure.

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// Default tolerance, in percentage points
pub const DEFAULT_COVERAGE_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageVerdict {
    /// Achieved coverage within tolerance of nominal
    WithinTolerance,
    /// Bounds looser than necessary
    Overpredicting,
    /// Bounds too tight
    Underpredicting,
    /// Nothing to evaluate
    NoSamples,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub evaluated: usize,
    /// Samples with abs error <= predicted bound
    pub covered: usize,
    /// Achieved coverage in percent
    pub achieved_coverage: Option<f64>,
    /// Nominal coverage in percent
    pub nominal_coverage: f64,
    /// achieved - nominal, in percentage points
    pub gap: Option<f64>,
    /// Share of samples whose error exceeded the bound
    pub fraction_exceeding: Option<f64>,
    pub tolerance: f64,
    pub verdict: CoverageVerdict,
}

impl CoverageReport {
    pub fn is_within_tolerance(&self) -> bool {
        self.verdict == CoverageVerdict::WithinTolerance
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OverpredictionChecker {
    tolerance: f64,
}

impl Default for OverpredictionChecker {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_COVERAGE_TOLERANCE,
        }
    }
}

impl OverpredictionChecker {
    pub fn new(tolerance: f64) -> Result<Self> {
        if !(tolerance >= 0.0 && tolerance.is_finite()) {
            return Err(CalibrationError::InvalidParameter(format!(
                "coverage tolerance must be a non-negative number, got {}",
                tolerance
            )));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn check(
        &self,
        predicted_bounds: &[f64],
        actual_abs_errors: &[f64],
        nominal_coverage_percentile: f64,
    ) -> Result<CoverageReport> {
        if predicted_bounds.len() != actual_abs_errors.len() {
            return Err(CalibrationError::InvalidParameter(format!(
                "{} predicted bounds for {} observed errors",
                predicted_bounds.len(),
                actual_abs_errors.len()
            )));
        }

        let evaluated = predicted_bounds.len();
        if evaluated == 0 {
            tracing::warn!("Coverage check skipped: no calibrated samples");
            return Ok(CoverageReport {
                evaluated: 0,
                covered: 0,
                achieved_coverage: None,
                nominal_coverage: nominal_coverage_percentile,
                gap: None,
                fraction_exceeding: None,
                tolerance: self.tolerance,
                verdict: CoverageVerdict::NoSamples,
            });
        }

        let covered = predicted_bounds
            .iter()
            .zip(actual_abs_errors)
            .filter(|(bound, error)| error <= bound)
            .count();

        let achieved = covered as f64 / evaluated as f64 * 100.0;
        let gap = achieved - nominal_coverage_percentile;
        let fraction_exceeding = (evaluated - covered) as f64 / evaluated as f64;

        let verdict = if gap > self.tolerance {
            CoverageVerdict::Overpredicting
        } else if gap < -self.tolerance {
            CoverageVerdict::Underpredicting
        } else {
            CoverageVerdict::WithinTolerance
        };

        match verdict {
            CoverageVerdict::Overpredicting => tracing::warn!(
                achieved = achieved,
                nominal = nominal_coverage_percentile,
                gap = gap,
                "Calibration overpredicts: bounds looser than the nominal coverage"
            ),
            CoverageVerdict::Underpredicting => tracing::warn!(
                achieved = achieved,
                nominal = nominal_coverage_percentile,
                gap = gap,
                "Calibration underpredicts: bounds tighter than the nominal coverage"
            ),
            _ => tracing::info!(
                achieved = achieved,
                nominal = nominal_coverage_percentile,
                fraction_exceeding = fraction_exceeding,
                "Coverage check passed"
            ),
        }

        Ok(CoverageReport {
            evaluated,
            covered,
            achieved_coverage: Some(achieved),
            nominal_coverage: nominal_coverage_percentile,
            gap: Some(gap),
            fraction_exceeding: Some(fraction_exceeding),
            tolerance: self.tolerance,
            verdict,
        })
    }
}

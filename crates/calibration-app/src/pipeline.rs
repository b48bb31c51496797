//! End-to-end calibration run: read results, split, calibrate on one half,
//! evaluate on the other and persist the artifacts.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use empirical_calibration::{
    AppliedCalibration, BinningCalibrator, BinningConfig, CalibrationApplier, CalibrationStore,
    CoverageReport, DatasetSplitter, EmpiricalCalibration, OverpredictionChecker,
};
use uq_statistics::{ResultsTable, StatisticsExtractor, UqMode};

use crate::config::{AppConfig, CalibrationMode};
use crate::run_identity::RunIdentity;

/// Paths written by a binning run
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub spline: PathBuf,
    pub limits: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    pub identity: RunIdentity,
    pub num_samples: usize,
    pub num_cal: usize,
    pub num_test: usize,
    /// Absent for calibration modes that compute nothing
    pub calibration: Option<EmpiricalCalibration>,
    pub applied: Option<AppliedCalibration>,
    /// Predicted std of the calibrated test samples, aligned with `applied`
    pub calibrated_std: Vec<f64>,
    pub coverage: Option<CoverageReport>,
    pub artifacts: Option<Artifacts>,
}

pub fn run(
    mode: UqMode,
    calibration_mode: CalibrationMode,
    results_filename: &Path,
    config: &AppConfig,
) -> Result<CalibrationOutcome> {
    let identity = RunIdentity::from_filename(mode, results_filename);
    tracing::info!(run = %identity, method = %identity.method_label(), "Starting calibration run");

    let table = ResultsTable::from_path(results_filename)
        .with_context(|| format!("Failed to read results from {}", results_filename.display()))?;
    let extracted = StatisticsExtractor::for_mode(mode)
        .extract(&table)
        .with_context(|| format!("Failed to extract {} statistics", mode))?;
    let predicted_std = extracted.predicted_std();

    let splitter = DatasetSplitter::new(config.cal_fraction, config.rng_seed)?;
    let dataset = splitter
        .split(extracted.samples)
        .context("Failed to split samples into calibration and test sets")?;
    tracing::info!(
        samples = dataset.len(),
        calibration = dataset.num_cal(),
        test = dataset.num_test(),
        seed = config.rng_seed,
        "Samples split"
    );

    let mut outcome = CalibrationOutcome {
        identity,
        num_samples: dataset.len(),
        num_cal: dataset.num_cal(),
        num_test: dataset.num_test(),
        calibration: None,
        applied: None,
        calibrated_std: Vec::new(),
        coverage: None,
        artifacts: None,
    };

    if calibration_mode == CalibrationMode::Inter {
        tracing::info!("Calibration by smooth interpolation in progress");
        return Ok(outcome);
    }

    let binning = BinningConfig {
        num_bins: config.num_bins.unwrap_or_else(|| mode.default_bins()),
        coverage_percentile: config.coverage_percentile,
        smoothing_window: config.smoothing_window,
        min_bin_samples: config.min_bin_samples,
    };
    let calibration = BinningCalibrator::new(binning)
        .compute(dataset.calibration_view())
        .context("Empirical calibration by binning failed")?;

    let applied = CalibrationApplier::new().apply(
        dataset.test_view(),
        &calibration.interpolant,
        calibration.min_sigma_auto(),
        calibration.max_sigma_auto(),
    );

    let test_std = dataset.test_values(&predicted_std)?;
    let calibrated_std = applied.select(&test_std)?;
    tracing::info!(
        calibrated = applied.len(),
        test = dataset.num_test(),
        "Calibration applied to test set"
    );

    let report = OverpredictionChecker::new(config.coverage_tolerance)?.check(
        &applied.predicted_bounds,
        &applied.abs_errors,
        config.coverage_percentile,
    )?;
    if let Some(achieved) = report.achieved_coverage {
        tracing::info!(
            achieved,
            nominal = report.nominal_coverage,
            verdict = ?report.verdict,
            "Coverage on test set"
        );
    }

    let store = CalibrationStore::new(outcome.identity.prefix(&config.output_dir));
    store
        .save(&calibration)
        .with_context(|| format!("Failed to store calibration in {}", config.output_dir.display()))?;

    outcome.artifacts = Some(Artifacts {
        spline: store.spline_path(),
        limits: store.limits_path(),
    });
    outcome.calibration = Some(calibration);
    outcome.applied = Some(applied);
    outcome.calibrated_std = calibrated_std;
    outcome.coverage = Some(report);

    Ok(outcome)
}

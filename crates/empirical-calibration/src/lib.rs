//! Empirical Calibration Module
//!
//! Turns self-reported predictive uncertainty (sigma) into empirically validated
//! error bounds. Calibration samples are binned by sigma, a per-bin error
//! threshold is measured at a target coverage, the threshold curve is smoothed
//! and restricted to its monotone region, and a monotone interpolant maps any
//! sigma inside that region to an error bound.

pub mod applier;
pub mod binning;
pub mod error;
pub mod interpolant;
pub mod overprediction;
pub mod smoothing;
pub mod splitter;
pub mod store;
pub mod types;


pub use applier::{AppliedCalibration, CalibrationApplier};
pub use binning::{BinningCalibrator, BinningConfig, EmpiricalCalibration};
pub use error::{CalibrationError, Result};
pub use interpolant::{CalibrationInterpolant, ControlPoint};
pub use overprediction::{CoverageReport, CoverageVerdict, OverpredictionChecker};
pub use splitter::{CalibrationDataset, DatasetSplitter};
pub use store::{CalibrationStore, StoredCalibration, StoredInterpolant};
pub use types::{
    CalibrationCurve, MonotonicTrustRegion, PredictionSample, QuantileBand, SigmaBin,
};

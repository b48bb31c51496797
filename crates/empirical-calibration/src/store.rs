//! Calibration Persistence
//!
//! Stores a fitted calibration as two JSON records keyed by a run prefix:
//! the interpolant's control points and the trust-region limits. Loading
//! rebuilds the same monotone interpolant from the stored knots.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::binning::EmpiricalCalibration;
use crate::error::{CalibrationError, Result};
use crate::interpolant::{CalibrationInterpolant, ControlPoint};

/// Interpolation scheme tag written with every stored interpolant
pub const INTERPOLATION_METHOD: &str = "monotone_cubic_hermite";

const SPLINE_SUFFIX: &str = "_calibration_binning_spline.json";
const LIMITS_SUFFIX: &str = "_calibration_binning_limits.json";

/// Serializable form of a calibration interpolant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInterpolant {
    pub method: String,
    pub coverage_percentile: f64,
    pub knots: Vec<ControlPoint>,
    pub created_at: DateTime<Utc>,
}

/// A calibration reloaded from disk
#[derive(Debug, Clone)]
pub struct StoredCalibration {
    pub interpolant: CalibrationInterpolant,
    pub min_sigma_auto: f64,
    pub max_sigma_auto: f64,
    pub coverage_percentile: f64,
}

#[derive(Debug, Clone)]
pub struct CalibrationStore {
    prefix: PathBuf,
}

impl CalibrationStore {
    /// `prefix` is the output directory joined with the run identity
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn spline_path(&self) -> PathBuf {
        self.with_suffix(SPLINE_SUFFIX)
    }

    pub fn limits_path(&self) -> PathBuf {
        self.with_suffix(LIMITS_SUFFIX)
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut path = self.prefix.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }

    pub fn save(&self, calibration: &EmpiricalCalibration) -> Result<()> {
        let spline_path = self.spline_path();
        if let Some(parent) = spline_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredInterpolant {
            method: INTERPOLATION_METHOD.to_string(),
            coverage_percentile: calibration.coverage_percentile,
            knots: calibration.interpolant.control_points().to_vec(),
            created_at: Utc::now(),
        };
        write_json(&spline_path, &stored)?;
        tracing::info!(path = %spline_path.display(), "Calibration spline (binning) stored");

        let limits_path = self.limits_path();
        let limits = [calibration.min_sigma_auto(), calibration.max_sigma_auto()];
        write_json(&limits_path, &limits)?;
        tracing::info!(path = %limits_path.display(), "Calibration limits (binning) stored");

        Ok(())
    }

    pub fn load(&self) -> Result<StoredCalibration> {
        let stored: StoredInterpolant = read_json(&self.spline_path())?;
        if stored.method != INTERPOLATION_METHOD {
            return Err(CalibrationError::InvalidData(format!(
                "unsupported interpolation method '{}'",
                stored.method
            )));
        }
        let [min_sigma_auto, max_sigma_auto]: [f64; 2] = read_json(&self.limits_path())?;
        if !(min_sigma_auto < max_sigma_auto) {
            return Err(CalibrationError::InvalidData(format!(
                "calibration limits [{}, {}] are not an interval",
                min_sigma_auto, max_sigma_auto
            )));
        }

        Ok(StoredCalibration {
            interpolant: CalibrationInterpolant::from_points(stored.knots)?,
            min_sigma_auto,
            max_sigma_auto,
            coverage_percentile: stored.coverage_percentile,
        })
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

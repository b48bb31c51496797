//! Calibration Interpolant
//!
//! Monotone piecewise-cubic Hermite interpolation (Fritsch–Carlson tangents,
//! PCHIP weighting) over the trust-region control points. Monotone data gives
//! a monotone interpolant, with no overshoot between knots. The interpolant is
//! fully described by its control points, which is what gets persisted.

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// A knot of the sigma → error-bound mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub sigma: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationInterpolant {
    points: Vec<ControlPoint>,
    tangents: Vec<f64>,
}

impl CalibrationInterpolant {
    /// Build from control points strictly increasing in sigma
    pub fn from_points(points: Vec<ControlPoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(CalibrationError::InsufficientData(format!(
                "interpolant needs at least 2 control points, got {}",
                points.len()
            )));
        }
        if points
            .iter()
            .any(|p| !p.sigma.is_finite() || !p.threshold.is_finite())
        {
            return Err(CalibrationError::InvalidParameter(
                "control points must be finite".to_string(),
            ));
        }
        if points.windows(2).any(|w| w[1].sigma <= w[0].sigma) {
            return Err(CalibrationError::InvalidParameter(
                "control point sigmas must be strictly increasing".to_string(),
            ));
        }

        let tangents = pchip_tangents(&points);
        Ok(Self { points, tangents })
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Closed sigma interval the interpolant is defined on
    pub fn domain(&self) -> (f64, f64) {
        (self.points[0].sigma, self.points[self.points.len() - 1].sigma)
    }

    /// Error bound at `sigma`, or `None` outside the domain
    pub fn evaluate(&self, sigma: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(sigma >= lo && sigma <= hi) {
            return None;
        }

        // Index of the interval [k, k+1] containing sigma
        let k = self
            .points
            .partition_point(|p| p.sigma <= sigma)
            .saturating_sub(1)
            .min(self.points.len() - 2);

        let p0 = self.points[k];
        let p1 = self.points[k + 1];
        let h = p1.sigma - p0.sigma;
        let t = (sigma - p0.sigma) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        Some(
            h00 * p0.threshold
                + h10 * h * self.tangents[k]
                + h01 * p1.threshold
                + h11 * h * self.tangents[k + 1],
        )
    }
}

fn pchip_tangents(points: &[ControlPoint]) -> Vec<f64> {
    let n = points.len();
    let widths: Vec<f64> = points.windows(2).map(|w| w[1].sigma - w[0].sigma).collect();
    let slopes: Vec<f64> = points
        .windows(2)
        .zip(&widths)
        .map(|(w, h)| (w[1].threshold - w[0].threshold) / h)
        .collect();

    let mut tangents = vec![0.0; n];
    tangents[0] = slopes[0];
    tangents[n - 1] = slopes[n - 2];

    for k in 1..n - 1 {
        let (d0, d1) = (slopes[k - 1], slopes[k]);
        if d0 * d1 <= 0.0 {
            // local extremum or flat segment
            tangents[k] = 0.0;
        } else {
            let w1 = 2.0 * widths[k] + widths[k - 1];
            let w2 = widths[k] + 2.0 * widths[k - 1];
            tangents[k] = (w1 + w2) / (w1 / d0 + w2 / d1);
        }
    }

    tangents
}

//! Threshold curve smoothing.

use crate::error::{CalibrationError, Result};

/// Default moving-average width, in bins
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Centered moving average truncated at the edges.
///
/// Each output is the mean of the input over `[i - h, i + h]` clipped to the
/// series, with `h = window / 2`. A non-decreasing input gives an output
/// that is non-decreasing up to floating-point rounding; plateaus can carry
/// dips of a few ulps, which `monotonic_region` tolerates.
pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 || window % 2 == 0 {
        return Err(CalibrationError::InvalidParameter(format!(
            "smoothing window must be a positive odd number, got {}",
            window
        )));
    }

    let n = values.len();
    let half = window / 2;

    Ok((0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            values[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect())
}

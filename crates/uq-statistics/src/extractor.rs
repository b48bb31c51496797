//! Statistics Extraction per Uncertainty Mode
//!
//! Each uncertainty model writes its own columns; the extractor for the
//! selected `UqMode` turns them into `PredictionSample`s:
//!
//! - homoscedastic: sigma is the predicted standard deviation
//! - heteroscedastic: sigma is recovered from the predicted log-variance
//! - quantile: sigma is the 10th–90th percentile spread scaled to a standard
//!   deviation; the band itself is kept for reporting

use std::fmt;
use std::str::FromStr;

use empirical_calibration::{PredictionSample, QuantileBand};
use serde::{Deserialize, Serialize};

use crate::error::{StatisticsError, StatisticsResult};
use crate::reader::ResultsTable;
use crate::summary::RegressionSummary;

/// Width of the 10th–90th percentile interval of a unit normal
pub const QUANTILE_SIGMA_DIVISOR: f64 = 2.56;

/// Mode of UQ regression that produced the results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UqMode {
    /// Homoscedastic
    Hom,
    /// Heteroscedastic
    Het,
    /// Quantile
    Qtl,
}

impl UqMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UqMode::Hom => "hom",
            UqMode::Het => "het",
            UqMode::Qtl => "qtl",
        }
    }

    /// Number of calibration bins suited to the mode's sigma resolution
    pub fn default_bins(&self) -> usize {
        match self {
            UqMode::Hom => 60,
            UqMode::Het | UqMode::Qtl => 31,
        }
    }
}

impl fmt::Display for UqMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UqMode {
    type Err = StatisticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hom" => Ok(UqMode::Hom),
            "het" => Ok(UqMode::Het),
            "qtl" => Ok(UqMode::Qtl),
            other => Err(StatisticsError::UnsupportedMode(other.to_string())),
        }
    }
}

/// Header names the extractors look up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    pub true_value: String,
    pub pred_mean: String,
    pub pred_std: String,
    pub pred_log_sigma2: String,
    pub pred_50p: String,
    pub pred_10p: String,
    pub pred_90p: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            true_value: "true".to_string(),
            pred_mean: "pred_mean".to_string(),
            pred_std: "pred_std".to_string(),
            pred_log_sigma2: "pred_log_sigma2".to_string(),
            pred_50p: "pred_50p".to_string(),
            pred_10p: "pred_10p".to_string(),
            pred_90p: "pred_90p".to_string(),
        }
    }
}

/// Uniform per-sample statistics for one results table
#[derive(Debug, Clone)]
pub struct ExtractedStatistics {
    pub samples: Vec<PredictionSample>,
    /// Name of the predicted quantity (header of the observed column)
    pub pred_name: String,
    /// Only produced by the quantile extractor
    pub quantile_band: Option<Vec<QuantileBand>>,
    pub summary: Option<RegressionSummary>,
}

impl ExtractedStatistics {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sigma(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.predicted_sigma).collect()
    }

    pub fn predicted_std(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.predicted_std).collect()
    }
}

#[derive(Debug, Clone)]
pub struct StatisticsExtractor {
    mode: UqMode,
    columns: ColumnNames,
}

impl StatisticsExtractor {
    pub fn for_mode(mode: UqMode) -> Self {
        Self {
            mode,
            columns: ColumnNames::default(),
        }
    }

    pub fn with_columns(mut self, columns: ColumnNames) -> Self {
        self.columns = columns;
        self
    }

    pub fn mode(&self) -> UqMode {
        self.mode
    }

    pub fn extract(&self, table: &ResultsTable) -> StatisticsResult<ExtractedStatistics> {
        let extracted = match self.mode {
            UqMode::Hom => self.extract_homoscedastic(table)?,
            UqMode::Het => self.extract_heteroscedastic(table)?,
            UqMode::Qtl => self.extract_quantile(table)?,
        };

        if let Some(summary) = &extracted.summary {
            tracing::info!(
                mode = %self.mode,
                pred_name = %extracted.pred_name,
                samples = extracted.len(),
                mse = summary.mse,
                mae = summary.mae,
                r2 = summary.r2,
                pearson = summary.pearson.unwrap_or(f64::NAN),
                "Prediction statistics"
            );
        }

        Ok(extracted)
    }

    fn extract_homoscedastic(&self, table: &ResultsTable) -> StatisticsResult<ExtractedStatistics> {
        let observed = table.column(&self.columns.true_value)?;
        let mean = table.column(&self.columns.pred_mean)?;
        let std = table.column(&self.columns.pred_std)?;
        check_non_negative(&std, &self.columns.pred_std)?;

        let samples = observed
            .iter()
            .zip(&mean)
            .zip(&std)
            .map(|((&y, &m), &s)| PredictionSample::new(y, m, s, s))
            .collect();

        Ok(self.finish(samples, &observed, &mean, None))
    }

    fn extract_heteroscedastic(&self, table: &ResultsTable) -> StatisticsResult<ExtractedStatistics> {
        let observed = table.column(&self.columns.true_value)?;
        let mean = table.column(&self.columns.pred_mean)?;
        let std = table.column(&self.columns.pred_std)?;
        let log_sigma2 = table.column(&self.columns.pred_log_sigma2)?;
        check_non_negative(&std, &self.columns.pred_std)?;

        let samples = observed
            .iter()
            .zip(&mean)
            .zip(&std)
            .zip(&log_sigma2)
            .map(|(((&y, &m), &s), &ls)| PredictionSample::new(y, m, ls.exp().sqrt(), s))
            .collect();

        Ok(self.finish(samples, &observed, &mean, None))
    }

    fn extract_quantile(&self, table: &ResultsTable) -> StatisticsResult<ExtractedStatistics> {
        let observed = table.column(&self.columns.true_value)?;
        let median = table.column(&self.columns.pred_50p)?;
        let lower = table.column(&self.columns.pred_10p)?;
        let upper = table.column(&self.columns.pred_90p)?;
        let std = if table.has_column(&self.columns.pred_std) {
            let std = table.column(&self.columns.pred_std)?;
            check_non_negative(&std, &self.columns.pred_std)?;
            Some(std)
        } else {
            None
        };

        let mut samples = Vec::with_capacity(observed.len());
        let mut band = Vec::with_capacity(observed.len());
        for i in 0..observed.len() {
            let spread = upper[i] - lower[i];
            if spread < 0.0 {
                return Err(StatisticsError::InvalidValue {
                    column: self.columns.pred_90p.clone(),
                    row: i + 1,
                    value: format!("{} (below 10th percentile {})", upper[i], lower[i]),
                });
            }
            let sigma = spread / QUANTILE_SIGMA_DIVISOR;
            let sample_std = std.as_ref().map(|s| s[i]).unwrap_or(sigma);

            samples.push(PredictionSample::new(observed[i], median[i], sigma, sample_std));
            band.push(QuantileBand {
                lower_10p: lower[i],
                upper_90p: upper[i],
            });
        }

        Ok(self.finish(samples, &observed, &median, Some(band)))
    }

    fn finish(
        &self,
        samples: Vec<PredictionSample>,
        observed: &[f64],
        predicted: &[f64],
        quantile_band: Option<Vec<QuantileBand>>,
    ) -> ExtractedStatistics {
        ExtractedStatistics {
            samples,
            pred_name: self.columns.true_value.clone(),
            quantile_band,
            summary: RegressionSummary::compute(observed, predicted),
        }
    }
}

fn check_non_negative(values: &[f64], column: &str) -> StatisticsResult<()> {
    match values.iter().position(|v| !(*v >= 0.0)) {
        Some(row) => Err(StatisticsError::InvalidValue {
            column: column.to_string(),
            row: row + 1,
            value: values[row].to_string(),
        }),
        None => Ok(()),
    }
}

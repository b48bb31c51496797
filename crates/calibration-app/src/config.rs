use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::env;
use std::path::PathBuf;

use crate::cli::Cli;

/// How the empirical calibration is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CalibrationMode {
    /// Binning by predicted sigma
    Bin,
    /// Smooth interpolation (not implemented)
    Inter,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub output_dir: PathBuf,              // ./outUQ/
    pub coverage_percentile: f64,         // 95
    pub cal_fraction: f64,                // 0.5
    pub smoothing_window: usize,          // 5 bins
    pub min_bin_samples: usize,           // 5
    pub coverage_tolerance: f64,          // 5 percentage points
    pub rng_seed: u64,
    pub num_bins: Option<usize>,          // None = per-mode default
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            output_dir: PathBuf::from(get("UQ_OUTPUT_DIR", "./outUQ/")),
            coverage_percentile: get("UQ_COVERAGE_PERCENTILE", "95")
                .parse()
                .context("UQ_COVERAGE_PERCENTILE must be a number")?,
            cal_fraction: get("UQ_CAL_FRACTION", "0.5")
                .parse()
                .context("UQ_CAL_FRACTION must be a number")?,
            smoothing_window: get("UQ_SMOOTHING_WINDOW", "5")
                .parse()
                .context("UQ_SMOOTHING_WINDOW must be a positive integer")?,
            min_bin_samples: get("UQ_MIN_BIN_SAMPLES", "5")
                .parse()
                .context("UQ_MIN_BIN_SAMPLES must be a positive integer")?,
            coverage_tolerance: get("UQ_COVERAGE_TOLERANCE", "5.0")
                .parse()
                .context("UQ_COVERAGE_TOLERANCE must be a number")?,
            rng_seed: get("UQ_RNG_SEED", "7102")
                .parse()
                .context("UQ_RNG_SEED must be an unsigned integer")?,
            num_bins: lookup("UQ_NUM_BINS")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("UQ_NUM_BINS must be a positive integer")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Command-line flags take precedence over the environment
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Result<Self> {
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(p) = cli.coverage_percentile {
            self.coverage_percentile = p;
        }
        if let Some(f) = cli.cal_fraction {
            self.cal_fraction = f;
        }
        if let Some(seed) = cli.rng_seed {
            self.rng_seed = seed;
        }
        if cli.num_bins.is_some() {
            self.num_bins = cli.num_bins;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.coverage_percentile > 0.0 && self.coverage_percentile <= 100.0) {
            bail!(
                "coverage percentile must lie in (0, 100], got {}",
                self.coverage_percentile
            );
        }
        if !(self.cal_fraction > 0.0 && self.cal_fraction < 1.0) {
            bail!("calibration fraction must lie in (0, 1), got {}", self.cal_fraction);
        }
        if self.smoothing_window == 0 || self.smoothing_window % 2 == 0 {
            bail!(
                "smoothing window must be a positive odd number, got {}",
                self.smoothing_window
            );
        }
        if self.min_bin_samples == 0 {
            bail!("minimum samples per bin must be at least 1");
        }
        if !(self.coverage_tolerance >= 0.0) {
            bail!("coverage tolerance must be non-negative, got {}", self.coverage_tolerance);
        }
        if matches!(self.num_bins, Some(n) if n < 2) {
            bail!("number of bins must be at least 2");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("./outUQ/"));
        assert_eq!(config.coverage_percentile, 95.0);
        assert_eq!(config.cal_fraction, 0.5);
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.rng_seed, 7102);
        assert!(config.num_bins.is_none());
    }

    #[test]
    fn test_env_values_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("UQ_COVERAGE_PERCENTILE", "90"),
            ("UQ_NUM_BINS", "40"),
            ("UQ_RNG_SEED", "11"),
        ]))
        .unwrap();
        assert_eq!(config.coverage_percentile, 90.0);
        assert_eq!(config.num_bins, Some(40));
        assert_eq!(config.rng_seed, 11);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("UQ_CAL_FRACTION", "abc")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("UQ_CAL_FRACTION", "1.5")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("UQ_SMOOTHING_WINDOW", "4")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("UQ_NUM_BINS", "1")])).is_err());
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = AppConfig::from_lookup(lookup(&[("UQ_RNG_SEED", "11")])).unwrap();
        let cli = Cli::try_parse_from([
            "calibration-app",
            "--uqmode",
            "hom",
            "--results-filename",
            "r.tsv",
            "--rng-seed",
            "99",
            "--output-dir",
            "/tmp/cal",
        ])
        .unwrap();

        let config = config.with_cli_overrides(&cli).unwrap();
        assert_eq!(config.rng_seed, 99);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/cal"));
        assert_eq!(config.coverage_percentile, 95.0);
    }
}

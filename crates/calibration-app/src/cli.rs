//! Command-line interface for calibration-app.

use clap::Parser;
use std::path::PathBuf;

use crate::config::CalibrationMode;

#[derive(Parser, Debug)]
#[command(name = "calibration-app")]
#[command(version, about = "Empirical calibration for UQ regression", long_about = None)]
pub struct Cli {
    /// Mode of UQ regression used: homoscedastic (hom), heteroscedastic (het) or quantile (qtl)
    #[arg(long)]
    pub uqmode: String,

    /// Mode of empirical calibration: by binning (bin) or by smooth interpolation (inter)
    #[arg(long, value_enum, default_value_t = CalibrationMode::Bin)]
    pub calibration_mode: CalibrationMode,

    /// File with UQ inference results (tab separated)
    #[arg(long, value_name = "FILE")]
    pub results_filename: PathBuf,

    /// Seed for the calibration/test split
    #[arg(long)]
    pub rng_seed: Option<u64>,

    /// Directory for calibration artifacts
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Nominal coverage in percent
    #[arg(long)]
    pub coverage_percentile: Option<f64>,

    /// Number of sigma bins (defaults to 60 for hom, 31 for het/qtl)
    #[arg(long)]
    pub num_bins: Option<usize>,

    /// Fraction of samples used for calibration
    #[arg(long)]
    pub cal_fraction: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_arguments() {
        let cli = Cli::try_parse_from([
            "calibration-app",
            "--uqmode",
            "het",
            "--results-filename",
            "results_DR=0.1.tsv",
        ])
        .unwrap();

        assert_eq!(cli.uqmode, "het");
        assert_eq!(cli.calibration_mode, CalibrationMode::Bin);
        assert_eq!(cli.results_filename, PathBuf::from("results_DR=0.1.tsv"));
        assert!(cli.rng_seed.is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "calibration-app",
            "--uqmode",
            "qtl",
            "--calibration-mode",
            "inter",
            "--results-filename",
            "r.tsv",
            "--rng-seed",
            "3",
            "--num-bins",
            "12",
            "--coverage-percentile",
            "90",
        ])
        .unwrap();

        assert_eq!(cli.calibration_mode, CalibrationMode::Inter);
        assert_eq!(cli.rng_seed, Some(3));
        assert_eq!(cli.num_bins, Some(12));
        assert_eq!(cli.coverage_percentile, Some(90.0));
    }

    #[test]
    fn test_results_filename_required() {
        assert!(Cli::try_parse_from(["calibration-app", "--uqmode", "hom"]).is_err());
    }
}

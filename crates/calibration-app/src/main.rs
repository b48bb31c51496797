mod cli;
mod config;
mod pipeline;
mod run_identity;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::AppConfig;
use uq_statistics::UqMode;

const DEFAULT_LOG_FILTER: &str = "calibration_app=info,empirical_calibration=info,uq_statistics=info";

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    let cli = Cli::parse();
    let mode: UqMode = cli
        .uqmode
        .parse()
        .with_context(|| format!("UQ mode '{}' not implemented", cli.uqmode))?;
    let config = AppConfig::from_env()?.with_cli_overrides(&cli)?;

    tracing::info!(
        uqmode = %mode,
        calibration_mode = ?cli.calibration_mode,
        results = %cli.results_filename.display(),
        output_dir = %config.output_dir.display(),
        "Starting empirical calibration"
    );

    let outcome = pipeline::run(mode, cli.calibration_mode, &cli.results_filename, &config)?;

    if let (Some(calibration), Some(applied)) = (&outcome.calibration, &outcome.applied) {
        tracing::debug!(
            samples = outcome.num_samples,
            calibration_samples = outcome.num_cal,
            bins = calibration.curve.len(),
            trust_bins = calibration.trust_region.len(),
            calibrated = applied.len(),
            calibrated_std = outcome.calibrated_std.len(),
            "Calibration details"
        );
    }

    match (&outcome.coverage, &outcome.artifacts) {
        (Some(report), Some(artifacts)) => {
            tracing::info!(
                run = %outcome.identity,
                calibrated = report.evaluated,
                test = outcome.num_test,
                achieved = report.achieved_coverage.unwrap_or(f64::NAN),
                verdict = ?report.verdict,
                spline = %artifacts.spline.display(),
                limits = %artifacts.limits.display(),
                "Calibration complete"
            );
        }
        _ => tracing::info!(run = %outcome.identity, "Calibration run finished without artifacts"),
    }

    Ok(())
}

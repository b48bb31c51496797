//! Run identity derived from the uncertainty mode and the results filename.
//!
//! Results files of dropout experiments carry the rate as a `DR=<rate>` token,
//! e.g. `qtl_results_DR=0.1_ep=100.tsv`. The identity keys every artifact of
//! the run: a found rate is written as a float percentage (`hom_DR=10.0`), a
//! missing one as the integer sentinel (`hom_DR=-1`).

use std::fmt;
use std::path::{Path, PathBuf};

use uq_statistics::UqMode;

/// Label used when the path carries no `DR=` token
pub const MISSING_RATE_LABEL: &str = "-1";

const RATE_TOKEN: &str = "DR=";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunIdentity {
    pub mode: UqMode,
    /// Dropout rate in percent, `None` when the path has no usable rate
    pub dropout_percent: Option<f64>,
}

impl RunIdentity {
    /// The whole path is searched, directories included
    pub fn from_filename(mode: UqMode, filename: &Path) -> Self {
        let name = filename.to_string_lossy();

        let dropout_percent = match parse_dropout_rate(&name) {
            Some(rate) => {
                let percent = (rate * 100.0 * 1e6).round() / 1e6;
                tracing::info!(rate, percent, "Dropout rate found in filename");
                Some(percent)
            }
            None => {
                tracing::warn!(
                    filename = %name,
                    "No dropout rate found in filename, using -1 to denote NA"
                );
                None
            }
        };

        Self {
            mode,
            dropout_percent,
        }
    }

    /// Rate as it appears in artifact names: "10.0", "12.5" or "-1"
    pub fn rate_label(&self) -> String {
        match self.dropout_percent {
            // Debug formatting keeps the trailing ".0" on whole numbers
            Some(percent) => format!("{:?}", percent),
            None => MISSING_RATE_LABEL.to_string(),
        }
    }

    /// Human-readable method label, e.g. "Dropout 10.0%"
    pub fn method_label(&self) -> String {
        format!("Dropout {}%", self.rate_label())
    }

    /// Artifact path prefix inside `output_dir`
    pub fn prefix(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.to_string())
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_DR={}", self.mode, self.rate_label())
    }
}

/// Numeric rate following the `DR=` token, if any
fn parse_dropout_rate(name: &str) -> Option<f64> {
    let start = name.find(RATE_TOKEN)? + RATE_TOKEN.len();
    let digits: String = name[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.trim_end_matches('.').parse().ok()
}

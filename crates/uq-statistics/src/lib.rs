//! UQ Statistics Extraction
//!
//! Reads tab-separated inference results and turns the model-specific columns
//! of each uncertainty mode (homoscedastic, heteroscedastic, quantile) into
//! the uniform per-sample shape consumed by empirical calibration.

pub mod error;
pub mod extractor;
pub mod reader;
pub mod summary;

pub use error::{StatisticsError, StatisticsResult};
pub use extractor::{ColumnNames, ExtractedStatistics, StatisticsExtractor, UqMode};
pub use reader::ResultsTable;
pub use summary::RegressionSummary;

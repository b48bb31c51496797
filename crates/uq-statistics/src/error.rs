use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatisticsError {
    #[error("UQ mode specified for calibration: {0} not implemented")]
    UnsupportedMode(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid value '{value}' in column {column} at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Empty results table")]
    EmptyTable,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StatisticsResult<T> = Result<T, StatisticsError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Degenerate bins: {bin_size} samples per bin, need at least {min_samples}")]
    DegenerateBins { bin_size: usize, min_samples: usize },

    #[error("Degenerate trust region: monotone run covers {length} bin(s), need at least 2")]
    DegenerateTrustRegion { length: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

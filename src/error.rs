use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("No trip data for {city}: {path}")]
    SourceNotFound { city: String, path: String },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Start time parse failed: {0}")]
    TimestampParse(String),

    #[error("No trips match the current filter ({0})")]
    EmptyResult(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StatsError {
    /// True for data-level failures the shell reports and recovers from by
    /// offering a restart; false for failures that should end the program.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StatsError::SourceNotFound { .. }
            | StatsError::MissingColumn(_)
            | StatsError::TimestampParse(_)
            | StatsError::EmptyResult(_)
            | StatsError::InvalidData(_)
            | StatsError::Polars(_) => true,
            StatsError::InvalidInput(_) | StatsError::Io(_) => false,
        }
    }
}

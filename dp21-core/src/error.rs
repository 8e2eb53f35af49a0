/// Error types for the DP21 projection workflow
use thiserror::Error;

/// Main error type for DP21 operations
#[derive(Error, Debug)]
pub enum Dp21Error {
    /// A required input is missing or a setting is out of range
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Sampling without replacement asked for more members than the pool holds
    #[error("Cannot draw {requested} samples without replacement from a pool of {pool_size}")]
    InvalidSampleSize { requested: usize, pool_size: usize },

    /// Projection year window is malformed
    #[error("Invalid projection years: start {start}, end {end}, step {step}")]
    InvalidYearRange { start: i32, end: i32, step: i32 },

    /// Scenario label is not one of the benchmark pools
    #[error("Unknown scenario: {0} (expected rcp26, rcp45 or rcp85)")]
    UnknownScenario(String),

    /// Scenario key absent from the temperature source
    #[error("Scenario {scenario} not found in {source_name}")]
    ScenarioNotFound {
        scenario: String,
        source_name: String,
    },

    /// A year needed for normalization is not on the data axis
    #[error("Reference year {year} not present in {context}")]
    MissingReferenceYear { year: i32, context: String },

    /// Arrays that must line up do not
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// No pool year matches any requested target year
    #[error("No pool years intersect the requested projection years")]
    EmptyYearIntersection,

    /// Requested target years missing from the pool (strict alignment only)
    #[error("Projection years not present in the ensemble pool: {0:?}")]
    DroppedYears(Vec<i32>),

    /// File read or write failed
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to parse or write JSON data
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed value in an input file
    #[error("Failed to parse input: {0}")]
    Parse(String),
}

/// Type alias for Results using Dp21Error
pub type Result<T> = std::result::Result<T, Dp21Error>;

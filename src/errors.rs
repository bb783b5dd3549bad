//! Errors
//!
//! Custom error types used throughout the `dtree` crate.
use thiserror::Error;

/// Errors that can occur while training, persisting or loading a decision tree.
#[derive(Debug, Error)]
pub enum DecisionTreeError {
    /// The requested target column is not one of the dataset columns.
    #[error("Target column '{0}' not found in dataset.")]
    TargetNotFound(String),
    /// A feature used for splitting has no categorical/numerical classification.
    #[error("Feature '{0}' has no feature type, expected categorical or numerical.")]
    MissingFeatureType(String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// A persisted tree node has an inconsistent shape.
    #[error("Invalid tree node: {0}")]
    InvalidTree(String),
    /// Unable to write model or predictions to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read model or data from file.
    #[error("Unable to read from file: {0}")]
    UnableToRead(String),
    /// Malformed CSV content.
    #[error("Error reading csv: {0}")]
    Csv(#[from] csv::Error),
    /// The input file carries no header row.
    #[error("Input file {0} is empty.")]
    EmptyInput(String),
}

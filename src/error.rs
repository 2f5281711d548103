//! Error types for building, querying, importing and generating ball tree data.

use std::num::ParseFloatError;

use thiserror::Error;

/// Reasons a batch of points cannot be indexed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("cannot build a tree from zero points")]
    EmptyInput,
    #[error("keys must have at least one coordinate")]
    ZeroDimensions,
    #[error("point {index} has {found} coordinates, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("point {index} has a NaN or infinite coordinate")]
    NonFiniteCoordinate { index: usize },
    #[error("point {index} repeats a key that is already present")]
    DuplicateKey { index: usize },
}

/// Reasons a query has no answer.
///
/// The `Option`-returning queries fold all of these into `None`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("query has {found} coordinates but the tree holds {expected}-dimensional keys")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("key not found")]
    NotFound,
    #[error("search radius must be positive, got {0}")]
    InvalidRadius(f64),
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("line {line}, column {column}: not a number")]
    InvalidNumber {
        line: usize,
        column: usize,
        #[source]
        source: ParseFloatError,
    },
    #[error("line {line}: a record needs a value followed by at least one coordinate")]
    MissingCoordinates { line: usize },
    #[error(transparent)]
    Build(#[from] BuildError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("keys need at least one coordinate")]
    ZeroDimensions,
    #[error("empty coordinate range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },
    #[error("cannot draw {requested} distinct keys from a space of {available}")]
    KeySpaceTooSmall { requested: usize, available: f64 },
}

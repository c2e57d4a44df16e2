use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning raw observations into feature rows.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("raw field `{field}` at {timestamp} is not a finite number")]
    NonFinite { field: String, timestamp: String },

    #[error("`aqi` is missing at {timestamp} but is needed as lag history")]
    MissingHistory { timestamp: String },

    #[error("weather readings are present on some observations but not on {timestamp}")]
    InconsistentWeather { timestamp: String },

    #[error("need at least {needed} observations to build one feature row, got {got}")]
    InsufficientHistory { needed: usize, got: usize },
}

/// A feature mapping that does not satisfy the trained feature order.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("features do not match the trained schema (missing: {missing:?}, unexpected: {unexpected:?})")]
    KeyMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("features are in a different order than the trained schema")]
    OrderMismatch,

    #[error("feature `{name}` must be a finite number")]
    NonNumeric { name: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("feature schema is empty")]
    Empty,

    #[error("feature `{0}` appears more than once")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset not found at {0}")]
    NotFound(PathBuf),

    #[error("dataset at {0} has no rows")]
    Empty(PathBuf),

    #[error("column `{0}` is not in the dataset")]
    MissingColumn(String),

    #[error("row {row}, column `{column}`: `{value}` is not a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found at {0}; run aqi-train first")]
    NotFound(PathBuf),

    #[error("model artifact at {path} could not be decoded: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("feature-order artifact at {path} is invalid: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model was trained on {model:?} but the feature-order artifact lists {schema:?}")]
    Incompatible {
        model: Vec<String>,
        schema: Vec<String>,
    },

    #[error(transparent)]
    Encode(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model fitting failed: {0}")]
    Fit(String),

    #[error("model inference failed: {0}")]
    Predict(String),

    #[error("input has {got} columns, model expects {expected}")]
    Shape { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote source answered with status {0}")]
    Status(u16),

    #[error("remote source returned no observations")]
    Empty,

    #[error("engineered remote rows have no `{0}` column to train on")]
    MissingTarget(String),

    #[error(transparent)]
    Features(#[from] FeatureError),
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model produced a non-finite prediction")]
    NonFinite,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key}=`{value}` is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

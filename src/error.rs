use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for waffle-hub operations.
#[derive(Debug, Error)]
pub enum WaffleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON from {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse YAML from {path}: {source}")]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write YAML to {path}: {source}")]
    YamlWrite {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Superb AI project file not found: {path}")]
    SuperbAiProjectNotFound { path: PathBuf },

    #[error("Invalid Superb AI export at {path}: {message}")]
    SuperbAiInvalid { path: PathBuf, message: String },

    #[error("{path} does not exist.")]
    ImageNotFound { path: PathBuf },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Dataset already exists: {path}")]
    DatasetExists { path: PathBuf },

    #[error("Dataset not found: {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Model[{name}] does not exist. {path}")]
    HubNotFound { name: String, path: PathBuf },

    #[error("Invalid hub configuration: {0}")]
    HubConfigInvalid(String),

    #[error(
        "Train artifacts already exist at {path}. Remove artifact to re-train (Hub::delete_artifact)."
    )]
    ArtifactExists { path: PathBuf },

    #[error("Train first! missing {path}")]
    TrainRequired { path: PathBuf },

    #[error("{task} does not support {operation} yet.")]
    UnsupportedTask { task: String, operation: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },
}

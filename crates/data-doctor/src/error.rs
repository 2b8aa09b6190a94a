//! Error types for the data-quality pipeline.
//!
//! Stage-level degradations (a column the outlier model cannot fit, a strategy
//! combination that fails to evaluate) are reported as values in the result
//! record. The variants here cover the conditions that stop a run.
//!
//! Errors serialize as `{ "code": ..., "message": ... }` so the JSON report and
//! the `--json` CLI output can carry them.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the data-quality pipeline.
#[derive(Error, Debug)]
pub enum DoctorError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input dataset cannot be processed at all (e.g. no columns).
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Too few usable values to run an evaluation.
    #[error("Insufficient data in column '{column}': found {found} non-null values, need at least {required}")]
    InsufficientData {
        column: String,
        found: usize,
        required: usize,
    },

    /// A model could not be fitted or scored.
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    /// A drift chart could not be drawn.
    #[error("Failed to render plot: {0}")]
    PlotRenderFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Markdown template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DoctorError>,
    },
}

impl DoctorError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DoctorError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidDataset(_) => "INVALID_DATASET",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::EvaluationFailed(_) => "EVALUATION_FAILED",
            Self::PlotRenderFailed(_) => "PLOT_RENDER_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is the "insufficient data" condition.
    pub fn is_insufficient_data(&self) -> bool {
        match self {
            Self::InsufficientData { .. } => true,
            Self::WithContext { source, .. } => source.is_insufficient_data(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigValidationError> for DoctorError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        DoctorError::InvalidConfig(err.to_string())
    }
}

impl Serialize for DoctorError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("DoctorError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, DoctorError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| DoctorError::Polars(e).with_context(context))
    }
}

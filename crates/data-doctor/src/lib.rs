//! Data Doctor
//!
//! A data-quality pipeline built on Polars. It ingests a tabular dataset and
//! produces a cleaned copy plus a diagnostic record.
//!
//! # Overview
//!
//! The pipeline runs these stages in order:
//!
//! - **Schema inference**: dtype tag, non-null count and null fraction per column
//! - **Profiling**: unique counts and a numeric summary (mean, std, min, max)
//! - **Outlier detection**: isolation forest per numeric column (informational)
//! - **Strategy search** (optional): scores every numeric/categorical
//!   imputation pairing with a random forest on a held-out split
//! - **Imputation**: mean or median for numeric columns, most frequent value
//!   or a reserved token for the rest
//! - **Deduplication**: first occurrence wins
//! - **Drift detection** (optional): mean shift against a baseline dataset
//! - **Suggestions**: `consider_drop_or_impute`, `high_cardinality` or `clean_ok`
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use data_doctor::{Pipeline, PipelineConfig, ProblemType, loader, reporting::ReportGenerator};
//!
//! let df = loader::load_csv("data/train.csv")?;
//!
//! let config = PipelineConfig::builder()
//!     .evaluate_imputations(true)
//!     .target_column("churned")
//!     .problem_type(ProblemType::Classification)
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
//!     .build()?
//!     .run(&df, None)?;
//!
//! ReportGenerator::new("outputs").write_all("data/train.csv", &result)?;
//! ```
//!
//! For one-off runs with default strategies, [`run_pipeline`] wraps the
//! builder.

pub mod cleaner;
pub mod config;
pub mod drift;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod outliers;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod search;
pub mod suggestions;
pub mod types;
pub mod utils;

pub use cleaner::Deduplicator;
pub use config::{
    CategoricalStrategy, ConfigValidationError, NumericStrategy, PipelineConfig,
    PipelineConfigBuilder, ProblemType,
};
pub use drift::DriftDetector;
pub use error::{DoctorError, Result as DoctorResult, ResultExt};
pub use imputers::Imputer;
pub use outliers::OutlierDetector;
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage, ProgressReporter,
    ProgressUpdate, run_pipeline,
};
pub use profiler::{DataProfiler, SchemaInferrer};
pub use reporting::{DriftVisualizer, SvgDriftVisualizer, ReportGenerator};
pub use search::ImputationStrategySearch;
pub use suggestions::SuggestionGenerator;
pub use types::{
    ColumnKind, ColumnProfile, ColumnSchema, DedupeMeta, DriftPlot, DriftRecord, PipelineResult,
    RunSummary, SearchResult, StrategyPair, Suggestion,
};

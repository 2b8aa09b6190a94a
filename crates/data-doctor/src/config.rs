//! Configuration types for the data-quality pipeline.
//!
//! Fixed thresholds live here as named constants. They are floors and seeds the
//! algorithms depend on, not tuning knobs, so they are not part of
//! [`PipelineConfig`]. Everything an operator may choose per run goes through
//! [`PipelineConfig::builder()`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Fixed thresholds
// =============================================================================

/// Minimum number of valid values before a column is scored for outliers.
pub const OUTLIER_MIN_SAMPLES: usize = 10;

/// Minimum number of non-null target values for the strategy search.
pub const SEARCH_MIN_TARGET_ROWS: usize = 30;

/// Minimum number of valid values on each side for a drift comparison.
pub const DRIFT_MIN_SAMPLES: usize = 5;

/// Share of rows held out for validation during the strategy search.
pub const VALIDATION_FRACTION: f64 = 0.25;

/// Seed shared by every randomized step (splits, forests).
pub const RANDOM_SEED: u64 = 42;

/// Number of trees in the surrogate random forest.
pub const SURROGATE_TREES: usize = 50;

/// Depth guard for surrogate trees.
pub const SURROGATE_MAX_DEPTH: usize = 48;

/// Number of trees in the isolation forest.
pub const ISOLATION_TREES: usize = 100;

/// Upper bound on the isolation forest subsample size.
pub const ISOLATION_MAX_SAMPLES: usize = 256;

/// Anomaly score above which a value is flagged (automatic contamination).
pub const ISOLATION_SCORE_THRESHOLD: f64 = 0.5;

/// Null fraction above which a column is flagged for drop-or-impute.
pub const NULL_FRACTION_THRESHOLD: f64 = 0.2;

/// Distinct-value count above which a non-numeric column is high cardinality.
pub const HIGH_CARDINALITY_THRESHOLD: usize = 1000;

/// Reserved fill token for constant categorical imputation.
pub const MISSING_TOKEN: &str = "__MISSING__";

/// Encoding for validation categories never seen in training.
pub const UNKNOWN_CATEGORY_CODE: f64 = -1.0;

/// Number of histogram bins produced by the drift visualizer.
pub const HISTOGRAM_BINS: usize = 30;

// =============================================================================
// Strategies
// =============================================================================

/// Strategy for imputing missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumericStrategy {
    /// Use the mean of observed values
    Mean,
    /// Use the median of observed values
    #[default]
    Median,
}

impl NumericStrategy {
    /// All numeric strategies in search enumeration order.
    pub const ALL: [NumericStrategy; 2] = [NumericStrategy::Mean, NumericStrategy::Median];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
        }
    }
}

/// Strategy for imputing missing non-numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalStrategy {
    /// Use the most frequent observed value
    #[default]
    MostFrequent,
    /// Use the reserved [`MISSING_TOKEN`]
    Constant,
}

impl CategoricalStrategy {
    /// All categorical strategies in search enumeration order.
    pub const ALL: [CategoricalStrategy; 2] =
        [CategoricalStrategy::MostFrequent, CategoricalStrategy::Constant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MostFrequent => "most_frequent",
            Self::Constant => "constant",
        }
    }
}

/// Kind of supervised problem the surrogate model solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    #[default]
    Classification,
    Regression,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Regression => "regression",
        }
    }
}

impl std::fmt::Display for ProblemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Pipeline configuration
// =============================================================================

/// Per-run options for the data-quality pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use data_doctor::config::{PipelineConfig, ProblemType};
///
/// let config = PipelineConfig::builder()
///     .evaluate_imputations(true)
///     .target_column("label")
///     .problem_type(ProblemType::Classification)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Numeric strategy used when no search runs or the search finds no winner.
    /// Default: Median
    pub numeric_imputation: NumericStrategy,

    /// Categorical strategy used when no search runs or the search finds no winner.
    /// Default: MostFrequent
    pub categorical_imputation: CategoricalStrategy,

    /// Run the imputation strategy search before imputing.
    /// Default: false
    pub evaluate_imputations: bool,

    /// Target column for the strategy search.
    /// Default: None
    pub target_column: Option<String>,

    /// Problem type for the surrogate model.
    /// Default: Classification
    pub problem_type: ProblemType,

    /// Key columns for deduplication. `None` compares all columns.
    /// Default: None
    pub dedupe_subset: Option<Vec<String>>,

    /// Columns compared for drift. `None` uses the columns both datasets share.
    /// Default: None
    pub drift_columns: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            numeric_imputation: NumericStrategy::default(),
            categorical_imputation: CategoricalStrategy::default(),
            evaluate_imputations: false,
            target_column: None,
            problem_type: ProblemType::default(),
            dedupe_subset: None,
            drift_columns: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.evaluate_imputations && self.target_column.is_none() {
            return Err(ConfigValidationError::MissingTargetColumn);
        }

        if let Some(target) = &self.target_column
            && target.trim().is_empty()
        {
            return Err(ConfigValidationError::EmptyColumnName(
                "target_column".to_string(),
            ));
        }

        for (field, columns) in [
            ("dedupe_subset", &self.dedupe_subset),
            ("drift_columns", &self.drift_columns),
        ] {
            if let Some(columns) = columns {
                if columns.is_empty() {
                    return Err(ConfigValidationError::EmptyColumnList(field.to_string()));
                }
                if columns.iter().any(|c| c.trim().is_empty()) {
                    return Err(ConfigValidationError::EmptyColumnName(field.to_string()));
                }
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Imputation evaluation requires a target column")]
    MissingTargetColumn,

    #[error("Column list '{0}' must not be empty when provided")]
    EmptyColumnList(String),

    #[error("Blank column name in '{0}'")]
    EmptyColumnName(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    numeric_imputation: Option<NumericStrategy>,
    categorical_imputation: Option<CategoricalStrategy>,
    evaluate_imputations: Option<bool>,
    target_column: Option<String>,
    problem_type: Option<ProblemType>,
    dedupe_subset: Option<Vec<String>>,
    drift_columns: Option<Vec<String>>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration, e.g. one loaded from JSON.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            numeric_imputation: Some(config.numeric_imputation),
            categorical_imputation: Some(config.categorical_imputation),
            evaluate_imputations: Some(config.evaluate_imputations),
            target_column: config.target_column,
            problem_type: Some(config.problem_type),
            dedupe_subset: config.dedupe_subset,
            drift_columns: config.drift_columns,
        }
    }

    /// Set the default numeric imputation strategy.
    pub fn numeric_imputation(mut self, strategy: NumericStrategy) -> Self {
        self.numeric_imputation = Some(strategy);
        self
    }

    /// Set the default categorical imputation strategy.
    pub fn categorical_imputation(mut self, strategy: CategoricalStrategy) -> Self {
        self.categorical_imputation = Some(strategy);
        self
    }

    /// Enable or disable the imputation strategy search.
    ///
    /// Requires a target column.
    pub fn evaluate_imputations(mut self, evaluate: bool) -> Self {
        self.evaluate_imputations = Some(evaluate);
        self
    }

    /// Set the target column for the strategy search.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the surrogate model's problem type.
    pub fn problem_type(mut self, problem_type: ProblemType) -> Self {
        self.problem_type = Some(problem_type);
        self
    }

    /// Restrict deduplication to these key columns.
    pub fn dedupe_subset<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dedupe_subset = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict drift detection to these columns.
    pub fn drift_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drift_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            numeric_imputation: self.numeric_imputation.unwrap_or_default(),
            categorical_imputation: self.categorical_imputation.unwrap_or_default(),
            evaluate_imputations: self.evaluate_imputations.unwrap_or(false),
            target_column: self.target_column,
            problem_type: self.problem_type.unwrap_or_default(),
            dedupe_subset: self.dedupe_subset,
            drift_columns: self.drift_columns,
        };

        config.validate()?;
        Ok(config)
    }
}

use crate::config::{CategoricalStrategy, NumericStrategy, ProblemType};
use crate::utils::{is_boolean_dtype, is_datetime_dtype, is_numeric_dtype};
use indexmap::IndexMap;
use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Schema & Profile
// ============================================================================

/// Explicit type tag for a column, derived once from its declared dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point numbers
    Numeric,
    /// Free-form strings
    Text,
    /// Dictionary-encoded categories
    Categorical,
    Boolean,
    Datetime,
    Other,
}

impl ColumnKind {
    pub fn from_dtype(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            Self::Numeric
        } else if is_datetime_dtype(dtype) {
            Self::Datetime
        } else if is_boolean_dtype(dtype) {
            Self::Boolean
        } else if matches!(dtype, DataType::String) {
            Self::Text
        } else if matches!(dtype, DataType::Categorical(_, _) | DataType::Enum(_, _)) {
            Self::Categorical
        } else {
            Self::Other
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Categorical => "categorical",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Other => "other",
        }
    }
}

/// Type and null-rate metadata for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Declared polars dtype, e.g. `f64` or `str`.
    pub dtype: String,
    pub kind: ColumnKind,
    pub non_null_count: usize,
    pub pct_null: f64,
}

/// Cardinality and, for numeric columns, summary statistics.
///
/// The numeric fields are `None` (and omitted from JSON) for non-numeric
/// columns and for numeric columns without a single usable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub n_unique: usize,
    pub pct_null: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ColumnProfile {
    pub fn has_numeric_summary(&self) -> bool {
        self.mean.is_some()
    }
}

pub type SchemaMap = IndexMap<String, ColumnSchema>;
pub type ProfileMap = IndexMap<String, ColumnProfile>;

/// Numeric column name to the row positions flagged anomalous.
///
/// Positions refer to the dataset as it was handed to the detector. The set is
/// informational and no later stage acts on it.
pub type OutlierSet = IndexMap<String, Vec<usize>>;

// ============================================================================
// Imputation & Deduplication
// ============================================================================

/// Strategy identifier recorded per imputed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    Mean,
    Median,
    MostFrequent,
    Constant,
}

impl ImputationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::MostFrequent => "most_frequent",
            Self::Constant => "constant",
        }
    }
}

impl From<NumericStrategy> for ImputationStrategy {
    fn from(strategy: NumericStrategy) -> Self {
        match strategy {
            NumericStrategy::Mean => Self::Mean,
            NumericStrategy::Median => Self::Median,
        }
    }
}

impl From<CategoricalStrategy> for ImputationStrategy {
    fn from(strategy: CategoricalStrategy) -> Self {
        match strategy {
            CategoricalStrategy::MostFrequent => Self::MostFrequent,
            CategoricalStrategy::Constant => Self::Constant,
        }
    }
}

/// Column name to the strategy actually applied to it.
pub type ImputationMeta = IndexMap<String, ImputationStrategy>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeMeta {
    pub removed_duplicates: usize,
}

// ============================================================================
// Drift
// ============================================================================

/// First-moment comparison of one column between baseline and new data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DriftRecord {
    Computed {
        mean_baseline: f64,
        mean_new: f64,
        /// `mean_new - mean_baseline`
        mean_diff: f64,
    },
    Insufficient { status: DriftStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    InsufficientData,
}

impl DriftRecord {
    pub fn insufficient() -> Self {
        Self::Insufficient {
            status: DriftStatus::InsufficientData,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Self::Insufficient { .. })
    }

    pub fn mean_diff(&self) -> Option<f64> {
        match self {
            Self::Computed { mean_diff, .. } => Some(*mean_diff),
            Self::Insufficient { .. } => None,
        }
    }
}

pub type DriftMap = IndexMap<String, DriftRecord>;

/// Paired visual artifacts for one drift column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftPlot {
    pub column: String,
    pub histogram: PathBuf,
    pub boxplot: PathBuf,
}

// ============================================================================
// Suggestions
// ============================================================================

/// Remediation tag for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    ConsiderDropOrImpute,
    HighCardinality,
    CleanOk,
}

impl Suggestion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsiderDropOrImpute => "consider_drop_or_impute",
            Self::HighCardinality => "high_cardinality",
            Self::CleanOk => "clean_ok",
        }
    }
}

pub type SuggestionMap = IndexMap<String, Suggestion>;

// ============================================================================
// Strategy Search
// ============================================================================

/// One numeric/categorical imputation pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategyPair {
    pub numeric: NumericStrategy,
    pub categorical: CategoricalStrategy,
}

impl StrategyPair {
    pub fn new(numeric: NumericStrategy, categorical: CategoricalStrategy) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    /// Every pairing, numeric strategies in the outer loop.
    pub fn all() -> Vec<StrategyPair> {
        NumericStrategy::ALL
            .iter()
            .flat_map(|&numeric| {
                CategoricalStrategy::ALL
                    .iter()
                    .map(move |&categorical| StrategyPair::new(numeric, categorical))
            })
            .collect()
    }
}

impl std::fmt::Display for StrategyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numeric.as_str(), self.categorical.as_str())
    }
}

/// Outcome of evaluating one pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Scored { score: f64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEvaluation {
    #[serde(flatten)]
    pub pair: StrategyPair,
    #[serde(flatten)]
    pub outcome: EvaluationOutcome,
}

impl StrategyEvaluation {
    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            EvaluationOutcome::Scored { score } => Some(score),
            EvaluationOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestStrategy {
    #[serde(flatten)]
    pub pair: StrategyPair,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub target_column: String,
    pub problem_type: ProblemType,
    /// Absent when no pairing produced a score.
    pub best: Option<BestStrategy>,
    /// Every attempted pairing in enumeration order.
    pub results: Vec<StrategyEvaluation>,
}

// ============================================================================
// Pipeline Result
// ============================================================================

/// Row and missing-value counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns: usize,
    pub missing_before: usize,
    pub missing_after: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    /// Share of cells that are present, 1.0 for an empty table.
    pub fn completeness_after(&self) -> f64 {
        let cells = self.rows_after * self.columns;
        if cells == 0 {
            1.0
        } else {
            1.0 - self.missing_after as f64 / cells as f64
        }
    }
}

/// Everything one pipeline run produced.
///
/// Serializes to the JSON report; the cleaned dataset is written separately.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub schema: SchemaMap,
    pub profile: ProfileMap,
    pub outliers: OutlierSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_search: Option<SearchResult>,
    pub imputation_meta: ImputationMeta,
    pub dedupe_meta: DedupeMeta,
    pub drift: DriftMap,
    pub drift_plots: Vec<DriftPlot>,
    pub suggestions: SuggestionMap,
    pub summary: RunSummary,
    #[serde(skip)]
    pub cleaned_dataset: DataFrame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind_from_dtype() {
        assert_eq!(ColumnKind::from_dtype(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_dtype(&DataType::Int32), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_dtype(&DataType::String), ColumnKind::Text);
        assert_eq!(ColumnKind::from_dtype(&DataType::Boolean), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_dtype(&DataType::Date), ColumnKind::Datetime);
    }

    #[test]
    fn test_profile_omits_absent_numeric_fields() {
        let profile = ColumnProfile {
            n_unique: 3,
            pct_null: 0.0,
            mean: None,
            std: None,
            min: None,
            max: None,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("mean").is_none());
        assert_eq!(json["n_unique"], 3);
        assert!(!profile.has_numeric_summary());
    }

    #[test]
    fn test_drift_record_serialization() {
        let computed = DriftRecord::Computed {
            mean_baseline: 1.0,
            mean_new: 1.5,
            mean_diff: 0.5,
        };
        let json = serde_json::to_value(&computed).unwrap();
        assert_eq!(json["mean_diff"], 0.5);

        let insufficient = serde_json::to_value(DriftRecord::insufficient()).unwrap();
        assert_eq!(insufficient["status"], "insufficient_data");

        let parsed: DriftRecord =
            serde_json::from_str(r#"{"status":"insufficient_data"}"#).unwrap();
        assert!(parsed.is_insufficient());
    }

    #[test]
    fn test_strategy_pairs_enumeration_order() {
        let pairs = StrategyPair::all();
        assert_eq!(pairs.len(), 4);
        assert_eq!(
            pairs[0],
            StrategyPair::new(NumericStrategy::Mean, CategoricalStrategy::MostFrequent)
        );
        assert_eq!(
            pairs[1],
            StrategyPair::new(NumericStrategy::Mean, CategoricalStrategy::Constant)
        );
        assert_eq!(
            pairs[3],
            StrategyPair::new(NumericStrategy::Median, CategoricalStrategy::Constant)
        );
    }

    #[test]
    fn test_strategy_evaluation_serialization() {
        let failed = StrategyEvaluation {
            pair: StrategyPair::new(NumericStrategy::Median, CategoricalStrategy::Constant),
            outcome: EvaluationOutcome::Failed {
                reason: "empty training split".to_string(),
            },
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["numeric"], "median");
        assert_eq!(json["categorical"], "constant");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "empty training split");
        assert!(failed.score().is_none());
    }

    #[test]
    fn test_run_summary_completeness() {
        let summary = RunSummary {
            rows_after: 10,
            columns: 2,
            missing_after: 5,
            ..Default::default()
        };
        assert!((summary.completeness_after() - 0.75).abs() < 1e-12);
        assert_eq!(RunSummary::default().completeness_after(), 1.0);
    }
}

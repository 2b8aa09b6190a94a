//! The `Pipeline` struct and its builder.

use crate::cleaner::Deduplicator;
use crate::config::{ConfigValidationError, PipelineConfig, ProblemType};
use crate::drift::DriftDetector;
use crate::error::{DoctorError, Result, ResultExt};
use crate::imputers::Imputer;
use crate::outliers::OutlierDetector;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::{DataProfiler, SchemaInferrer};
use crate::reporting::DriftVisualizer;
use crate::search::ImputationStrategySearch;
use crate::suggestions::SuggestionGenerator;
use crate::types::{DriftMap, DriftPlot, PipelineResult, RunSummary, StrategyPair};
use crate::utils::{numeric_column_names, total_missing};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The data-quality pipeline.
///
/// Stages run in a fixed order: schema inference, profiling, outlier
/// detection, the optional strategy search, imputation, deduplication, the
/// optional drift detection and finally suggestions. Every stage reads the
/// previous stage's frame and returns a new one.
///
/// # Example
///
/// ```rust,ignore
/// use data_doctor::{Pipeline, PipelineConfig, ProblemType};
///
/// let config = PipelineConfig::builder()
///     .evaluate_imputations(true)
///     .target_column("churned")
///     .problem_type(ProblemType::Classification)
///     .build()?;
///
/// let result = Pipeline::builder().config(config).build()?.run(&df, Some(&baseline))?;
/// println!("{}", serde_json::to_string_pretty(&result)?);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    drift_visualizer: Option<Arc<dyn DriftVisualizer>>,
}

// Independent runs may execute on separate threads.
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over `dataset`, comparing against `baseline` when one
    /// is supplied.
    ///
    /// # Errors
    ///
    /// - [`DoctorError::InvalidDataset`] when `dataset` has no columns
    /// - [`DoctorError::ColumnNotFound`] or [`DoctorError::InsufficientData`]
    ///   (wrapped with context) when the strategy search cannot start
    /// - [`DoctorError::ColumnNotFound`] for configured dedupe or drift
    ///   columns that do not exist
    pub fn run(&self, dataset: &DataFrame, baseline: Option<&DataFrame>) -> Result<PipelineResult> {
        match self.run_internal(dataset, baseline) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn stage_started(&self, stage: PipelineStage, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.report_progress(ProgressUpdate::new(stage, 0.0, message));
    }

    fn stage_finished(&self, stage: PipelineStage, message: impl Into<String>) {
        self.report_progress(ProgressUpdate::new(stage, 1.0, message));
    }

    fn run_internal(&self, dataset: &DataFrame, baseline: Option<&DataFrame>) -> Result<PipelineResult> {
        let start_time = Instant::now();

        self.stage_started(PipelineStage::Initializing, "Starting data-quality pipeline...");
        if dataset.width() == 0 {
            return Err(DoctorError::InvalidDataset(
                "dataset has no columns".to_string(),
            ));
        }
        if let Some(b) = baseline
            && b.width() == 0
        {
            return Err(DoctorError::InvalidDataset(
                "baseline dataset has no columns".to_string(),
            ));
        }
        let missing_before = total_missing(dataset);
        debug!(
            "Input: {} rows x {} columns, {} missing cells",
            dataset.height(),
            dataset.width(),
            missing_before
        );

        // Step 1: Schema
        self.stage_started(PipelineStage::SchemaInference, "Inferring schema...");
        let schema = SchemaInferrer::infer(dataset);
        self.stage_finished(PipelineStage::SchemaInference, format!("Schema inferred for {} columns", schema.len()));

        // Step 2: Profile
        self.stage_started(PipelineStage::Profiling, "Profiling dataset...");
        let profile = DataProfiler::profile(dataset);
        self.stage_finished(PipelineStage::Profiling, "Profiling complete");

        // Step 3: Outliers (informational; nothing downstream consumes them)
        self.stage_started(PipelineStage::OutlierDetection, "Detecting numeric outliers...");
        let numeric_columns = numeric_column_names(dataset);
        let outliers = OutlierDetector::detect(dataset, &numeric_columns);
        let flagged: usize = outliers.values().map(Vec::len).sum();
        self.stage_finished(
            PipelineStage::OutlierDetection,
            format!("Flagged {} outlier cells across {} numeric columns", flagged, outliers.len()),
        );

        // Step 4: Optional strategy search
        let strategy_search = if self.config.evaluate_imputations {
            let target = self.config.target_column.as_deref().ok_or_else(|| {
                DoctorError::InvalidConfig(
                    "evaluate_imputations requires a target column".to_string(),
                )
            })?;

            self.search_started(target);
            let search = ImputationStrategySearch::run(dataset, target, self.config.problem_type)
                .context("Imputation strategy search")?;
            self.stage_finished(
                PipelineStage::StrategySearch,
                match &search.best {
                    Some(best) => format!("Best strategy: {} ({:.4})", best.pair, best.score),
                    None => "No strategy could be evaluated, using configured defaults".to_string(),
                },
            );
            Some(search)
        } else {
            None
        };

        let pair = strategy_search
            .as_ref()
            .and_then(|s| s.best)
            .map(|best| best.pair)
            .unwrap_or_else(|| {
                StrategyPair::new(
                    self.config.numeric_imputation,
                    self.config.categorical_imputation,
                )
            });

        // Step 5: Impute
        self.stage_started(PipelineStage::Imputation, format!("Imputing missing values ({})...", pair));
        let (imputed, imputation_meta) = Imputer::impute_with(dataset, pair).context("Imputation")?;
        self.stage_finished(
            PipelineStage::Imputation,
            format!("Imputed {} columns", imputation_meta.len()),
        );

        // Step 6: Deduplicate
        self.stage_started(PipelineStage::Deduplication, "Removing duplicate rows...");
        let (cleaned, dedupe_meta) =
            Deduplicator::dedupe(&imputed, self.config.dedupe_subset.as_deref())
                .context("Deduplication")?;
        self.stage_finished(
            PipelineStage::Deduplication,
            format!("Removed {} duplicate rows", dedupe_meta.removed_duplicates),
        );

        // Step 7: Optional drift against the baseline
        let (drift, drift_plots) = match baseline {
            Some(baseline) => self.detect_drift(baseline, &cleaned)?,
            None => (DriftMap::new(), Vec::new()),
        };

        // Step 8: Suggestions on the cleaned dataset
        self.stage_started(PipelineStage::Suggestions, "Generating fix suggestions...");
        let suggestions = SuggestionGenerator::suggest(&cleaned);
        self.stage_finished(PipelineStage::Suggestions, "Suggestions ready");

        let summary = RunSummary {
            rows_before: dataset.height(),
            rows_after: cleaned.height(),
            columns: cleaned.width(),
            missing_before,
            missing_after: total_missing(&cleaned),
            duration_ms: start_time.elapsed().as_millis() as u64,
        };
        info!(
            "Pipeline finished in {} ms: {} -> {} rows, {} -> {} missing cells",
            summary.duration_ms,
            summary.rows_before,
            summary.rows_after,
            summary.missing_before,
            summary.missing_after
        );

        Ok(PipelineResult {
            schema,
            profile,
            outliers,
            strategy_search,
            imputation_meta,
            dedupe_meta,
            drift,
            drift_plots,
            suggestions,
            summary,
            cleaned_dataset: cleaned,
        })
    }

    fn search_started(&self, target: &str) {
        info!("Searching imputation strategies...");
        self.report_progress(ProgressUpdate::with_sub_stage(
            PipelineStage::StrategySearch,
            format!("Target: {}", target),
            0.0,
            "Evaluating imputation strategy combinations...",
        ));
    }

    fn detect_drift(
        &self,
        baseline: &DataFrame,
        cleaned: &DataFrame,
    ) -> Result<(DriftMap, Vec<DriftPlot>)> {
        self.stage_started(PipelineStage::DriftDetection, "Detecting drift against baseline...");
        let columns = self.config.drift_columns.as_deref();
        let drift = DriftDetector::detect(baseline, cleaned, columns).context("Drift detection")?;

        let plots = match &self.drift_visualizer {
            Some(visualizer) => {
                let columns = columns
                    .map(<[String]>::to_vec)
                    .unwrap_or_else(|| DriftDetector::shared_columns(baseline, cleaned));
                visualizer
                    .render(baseline, cleaned, &columns)
                    .unwrap_or_else(|e| {
                        warn!("Drift visualization failed: {}", e);
                        Vec::new()
                    })
            }
            None => Vec::new(),
        };

        let insufficient = drift.values().filter(|r| r.is_insufficient()).count();
        self.stage_finished(
            PipelineStage::DriftDetection,
            format!(
                "Compared {} columns ({} with insufficient data), {} plots",
                drift.len(),
                insufficient,
                plots.len()
            ),
        );
        Ok((drift, plots))
    }
}

/// Run the pipeline with default strategies.
///
/// `target_column` and `problem_type` only matter when
/// `evaluate_imputations` is set; a missing target is then an
/// [`DoctorError::InvalidConfig`].
pub fn run_pipeline(
    dataset: &DataFrame,
    baseline: Option<&DataFrame>,
    evaluate_imputations: bool,
    target_column: Option<&str>,
    problem_type: Option<ProblemType>,
) -> Result<PipelineResult> {
    let mut config = PipelineConfig::builder().evaluate_imputations(evaluate_imputations);
    if let Some(target) = target_column {
        config = config.target_column(target);
    }
    if let Some(problem_type) = problem_type {
        config = config.problem_type(problem_type);
    }

    Pipeline::builder()
        .config(config.build()?)
        .build()?
        .run(dataset, baseline)
}

/// Builder for creating a [`Pipeline`] instance.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    drift_visualizer: Option<Arc<dyn DriftVisualizer>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during the run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Render drift artifacts whenever a baseline is supplied.
    pub fn drift_visualizer(mut self, visualizer: Arc<dyn DriftVisualizer>) -> Self {
        self.drift_visualizer = Some(visualizer);
        self
    }

    /// Build the pipeline. Fails when the configuration does not validate.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            drift_visualizer: self.drift_visualizer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumericStrategy;
    use crate::types::ImputationStrategy;
    use std::sync::Mutex;

    fn sample_df() -> DataFrame {
        df![
            "a" => [Some(1.0), None, Some(3.0), Some(4.0), Some(5.0), Some(6.0)],
            "b" => [Some("x"), Some("y"), None, Some("x"), Some("y"), Some("x")],
        ]
        .unwrap()
    }

    struct RecordingVisualizer {
        columns: Mutex<Vec<String>>,
    }

    impl DriftVisualizer for RecordingVisualizer {
        fn render(
            &self,
            _baseline: &DataFrame,
            _cleaned: &DataFrame,
            columns: &[String],
        ) -> Result<Vec<DriftPlot>> {
            if let Ok(mut seen) = self.columns.lock() {
                seen.extend_from_slice(columns);
            }
            Ok(columns
                .iter()
                .map(|c| DriftPlot {
                    column: c.clone(),
                    histogram: format!("hist_{c}.svg").into(),
                    boxplot: format!("box_{c}.svg").into(),
                })
                .collect())
        }
    }

    // ==================== Builder ====================

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config(), &PipelineConfig::default());
        assert!(pipeline.drift_visualizer.is_none());
    }

    #[test]
    fn test_builder_rejects_search_without_target() {
        let config = PipelineConfig {
            evaluate_imputations: true,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    // ==================== Run ====================

    #[test]
    fn test_run_without_baseline() {
        let result = Pipeline::builder().build().unwrap().run(&sample_df(), None).unwrap();

        assert_eq!(result.schema.len(), 2);
        assert_eq!(result.profile.len(), 2);
        assert!(result.drift.is_empty());
        assert!(result.drift_plots.is_empty());
        assert!(result.strategy_search.is_none());
        assert_eq!(result.imputation_meta["a"], ImputationStrategy::Median);
        assert_eq!(result.imputation_meta["b"], ImputationStrategy::MostFrequent);
        assert_eq!(result.summary.missing_before, 2);
        assert_eq!(result.summary.missing_after, 0);
    }

    #[test]
    fn test_configured_numeric_strategy_is_used() {
        let config = PipelineConfig::builder()
            .numeric_imputation(NumericStrategy::Mean)
            .build()
            .unwrap();
        let result = Pipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .run(&sample_df(), None)
            .unwrap();
        assert_eq!(result.imputation_meta["a"], ImputationStrategy::Mean);
    }

    #[test]
    fn test_zero_width_dataset_rejected() {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();
        let pipeline = Pipeline::builder()
            .on_progress(move |update| {
                if update.stage == PipelineStage::Failed
                    && let Ok(mut f) = sink.lock()
                {
                    f.push(update.message);
                }
            })
            .build()
            .unwrap();

        let err = pipeline.run(&DataFrame::empty(), None).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATASET");
        assert_eq!(failures.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_progress_reports_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();
        Pipeline::builder()
            .on_progress(move |update| {
                if let Ok(mut s) = sink.lock() {
                    s.push(update.stage);
                }
            })
            .build()
            .unwrap()
            .run(&sample_df(), None)
            .unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&PipelineStage::Initializing));
        assert_eq!(stages.last(), Some(&PipelineStage::Complete));
        assert!(!stages.contains(&PipelineStage::StrategySearch));
        assert!(!stages.contains(&PipelineStage::DriftDetection));
    }

    #[test]
    fn test_search_insufficient_data_is_hard_error() {
        let err = run_pipeline(
            &sample_df(),
            None,
            true,
            Some("a"),
            Some(ProblemType::Regression),
        )
        .unwrap_err();
        assert!(err.is_insufficient_data());
        assert!(err.to_string().contains("Imputation strategy search"));
    }

    #[test]
    fn test_drift_visualizer_receives_shared_columns() {
        let visualizer = Arc::new(RecordingVisualizer {
            columns: Mutex::new(Vec::new()),
        });
        let baseline = df!["a" => [1.0, 2.0, 3.0, 4.0, 5.0], "other" => [1, 2, 3, 4, 5]].unwrap();

        let result = Pipeline::builder()
            .drift_visualizer(visualizer.clone())
            .build()
            .unwrap()
            .run(&sample_df(), Some(&baseline))
            .unwrap();

        assert_eq!(*visualizer.columns.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(result.drift.len(), 1);
        assert_eq!(result.drift_plots.len(), 1);
        assert_eq!(result.drift_plots[0].column, "a");
    }

    #[test]
    fn test_unknown_drift_column_is_error() {
        let config = PipelineConfig::builder().drift_columns(["nope"]).build().unwrap();
        let err = Pipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .run(&sample_df(), Some(&sample_df()))
            .unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }
}

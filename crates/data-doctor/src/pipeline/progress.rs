//! Progress reporting for the data-quality pipeline.
//!
//! The pipeline emits one update when a stage starts and one when it
//! finishes, followed by a terminal `Complete` or `Failed` update.
//!
//! # Example
//!
//! ```rust,ignore
//! use data_doctor::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:>3.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&df, None)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the data-quality pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Initializing,
    SchemaInference,
    Profiling,
    OutlierDetection,
    /// Only entered when imputation evaluation is enabled.
    StrategySearch,
    Imputation,
    Deduplication,
    /// Only entered when a baseline dataset is supplied.
    DriftDetection,
    Suggestions,
    Complete,
    Failed,
}

impl PipelineStage {
    /// Working stages in execution order (terminal states excluded).
    pub const WORKING: [PipelineStage; 9] = [
        Self::Initializing,
        Self::SchemaInference,
        Self::Profiling,
        Self::OutlierDetection,
        Self::StrategySearch,
        Self::Imputation,
        Self::Deduplication,
        Self::DriftDetection,
        Self::Suggestions,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::SchemaInference => "Inferring Schema",
            Self::Profiling => "Profiling Dataset",
            Self::OutlierDetection => "Detecting Outliers",
            Self::StrategySearch => "Searching Imputation Strategies",
            Self::Imputation => "Imputing Values",
            Self::Deduplication => "Removing Duplicates",
            Self::DriftDetection => "Detecting Drift",
            Self::Suggestions => "Generating Suggestions",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run attributed to this stage.
    ///
    /// Working stage weights sum to 1.0; the search dominates because it
    /// trains four forests.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::SchemaInference => 0.04,
            Self::Profiling => 0.08,
            Self::OutlierDetection => 0.12,
            Self::StrategySearch => 0.40,
            Self::Imputation => 0.12,
            Self::Deduplication => 0.08,
            Self::DriftDetection => 0.10,
            Self::Suggestions => 0.04,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            stage => Self::WORKING
                .iter()
                .take_while(|s| *s != stage)
                .map(PipelineStage::weight)
                .sum(),
        }
    }
}

/// A progress update emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Optional detail such as the search target column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        let progress = stage.base_progress() + stage.weight() * stage_progress;
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
        }
    }

    pub fn with_sub_stage(
        stage: PipelineStage,
        sub_stage: impl Into<String>,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            progress: 0.0,
            stage_progress: 0.0,
            ..Self::new(PipelineStage::Failed, 0.0, message)
        }
    }
}

/// Receives progress updates from the pipeline.
///
/// Implementations must be `Send + Sync` so a pipeline can run on a worker
/// thread while another thread consumes its updates.
pub trait ProgressReporter: Send + Sync {
    /// Called at every stage boundary. Should return quickly.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_stage_weights_sum_to_one() {
        let total: f32 = PipelineStage::WORKING.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        assert_eq!(PipelineStage::Initializing.base_progress(), 0.0);
        assert!((PipelineStage::Profiling.base_progress() - 0.06).abs() < 1e-6);
        assert!((PipelineStage::Imputation.base_progress() - 0.66).abs() < 1e-6);
        assert_eq!(PipelineStage::Complete.base_progress(), 1.0);

        let mut previous = -1.0;
        for stage in PipelineStage::WORKING {
            assert!(stage.base_progress() > previous);
            previous = stage.base_progress();
        }
    }

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(PipelineStage::StrategySearch, 0.5, "Searching...");
        assert_eq!(update.stage, PipelineStage::StrategySearch);
        assert!(update.sub_stage.is_none());
        assert!((update.progress - 0.46).abs() < 1e-6);
        assert_eq!(update.stage_progress, 0.5);
    }

    #[test]
    fn test_progress_update_clamps() {
        let update = ProgressUpdate::new(PipelineStage::Suggestions, 3.0, "overflow");
        assert_eq!(update.stage_progress, 1.0);
        assert!(update.progress <= 1.0);
    }

    #[test]
    fn test_terminal_updates() {
        let done = ProgressUpdate::complete("Done");
        assert_eq!(done.stage, PipelineStage::Complete);
        assert_eq!(done.progress, 1.0);

        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, PipelineStage::Failed);
        assert_eq!(failed.progress, 0.0);
        assert_eq!(failed.message, "boom");
    }

    #[test]
    fn test_progress_update_json() {
        let update = ProgressUpdate::with_sub_stage(
            PipelineStage::StrategySearch,
            "Target: label",
            0.0,
            "Evaluating imputation strategies",
        );
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"stage\":\"strategy_search\""));
        assert!(json.contains("\"sub_stage\":\"Target: label\""));

        let plain = serde_json::to_string(&ProgressUpdate::new(PipelineStage::Profiling, 0.0, "x")).unwrap();
        assert!(!plain.contains("sub_stage"));
    }

    #[test]
    fn test_closure_progress_reporter_across_threads() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let counter = call_count.clone();
        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let worker = reporter.clone();
        std::thread::spawn(move || {
            worker.report(ProgressUpdate::new(PipelineStage::Profiling, 0.5, "from worker"));
        })
        .join()
        .unwrap();
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }
}

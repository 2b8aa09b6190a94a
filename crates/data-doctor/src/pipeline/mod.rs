//! Pipeline orchestration and progress reporting.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder, run_pipeline};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};

//! Output collaborators: the cleaned CSV, the JSON and Markdown audit
//! reports, and drift charts.
//!
//! # Example
//!
//! ```rust,ignore
//! use data_doctor::reporting::{ReportGenerator, SvgDriftVisualizer};
//!
//! let generator = ReportGenerator::new("outputs");
//! let paths = generator.write_all("data/train.csv", &result)?;
//! println!("Report: {}", paths.markdown_report.display());
//! ```

pub mod drift_plots;
mod generator;

pub use drift_plots::{DriftVisualizer, SvgDriftVisualizer};
pub use generator::{
    AuditReport, CLEANED_CSV_NAME, JSON_REPORT_NAME, MARKDOWN_REPORT_NAME, ReportGenerator,
    ReportPaths,
};

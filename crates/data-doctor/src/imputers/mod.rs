//! Imputation of missing values.
//!
//! One strategy per type family:
//! - numeric columns: mean or median of the observed values
//! - everything else: most frequent value or a reserved constant token

mod statistical;

pub use statistical::Imputer;

//! Unsupervised outlier detection for numeric columns.
//!
//! The flags are informational: no later stage removes or caps flagged rows.

mod isolation_forest;

pub use isolation_forest::{IsolationForest, average_path_length};

use crate::config::{
    ISOLATION_MAX_SAMPLES, ISOLATION_SCORE_THRESHOLD, ISOLATION_TREES, OUTLIER_MIN_SAMPLES,
    RANDOM_SEED,
};
use crate::error::Result;
use crate::types::OutlierSet;
use crate::utils::coerce_numeric;
use polars::prelude::*;
use tracing::{debug, warn};

/// Flags anomalous values per numeric column with an isolation forest.
pub struct OutlierDetector;

impl OutlierDetector {
    /// Detect outliers in each of `columns`.
    ///
    /// Every requested column gets an entry. Columns with fewer than
    /// [`OUTLIER_MIN_SAMPLES`] valid values, and columns the model cannot be
    /// fitted on, get an empty list. One column failing never affects another.
    pub fn detect(df: &DataFrame, columns: &[String]) -> OutlierSet {
        let mut outliers = OutlierSet::with_capacity(columns.len());

        for name in columns {
            let flagged = match Self::detect_column(df, name) {
                Ok(flagged) => flagged,
                Err(e) => {
                    warn!("Outlier detection skipped for '{}': {}", name, e);
                    Vec::new()
                }
            };
            debug!("outliers {}: {} flagged", name, flagged.len());
            outliers.insert(name.clone(), flagged);
        }

        outliers
    }

    fn detect_column(df: &DataFrame, name: &str) -> Result<Vec<usize>> {
        let series = df.column(name)?.as_materialized_series();

        let (positions, values): (Vec<usize>, Vec<f64>) = coerce_numeric(series)?
            .into_iter()
            .enumerate()
            .filter_map(|(row, v)| v.map(|v| (row, v)))
            .unzip();

        if values.len() < OUTLIER_MIN_SAMPLES {
            return Ok(Vec::new());
        }

        let forest =
            IsolationForest::fit(&values, ISOLATION_TREES, ISOLATION_MAX_SAMPLES, RANDOM_SEED)?;

        Ok(forest
            .anomalies(&values, ISOLATION_SCORE_THRESHOLD)
            .into_iter()
            .map(|i| positions[i])
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_flags_extreme_value_by_row_position() {
        let mut values: Vec<Option<f64>> = (0..60).map(|i| Some((i % 20) as f64)).collect();
        values[7] = None;
        values.push(Some(5_000.0));
        let df = df!["x" => values].unwrap();

        let outliers = OutlierDetector::detect(&df, &names(&["x"]));
        assert!(outliers["x"].contains(&60));
        assert!(outliers["x"].len() < 30);
        assert!(!outliers["x"].contains(&7));
    }

    #[test]
    fn test_below_sample_floor_is_empty() {
        let df = df!["x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9_000.0]].unwrap();
        let outliers = OutlierDetector::detect(&df, &names(&["x"]));
        assert_eq!(outliers["x"], Vec::<usize>::new());
    }

    #[test]
    fn test_model_failure_is_isolated_per_column() {
        let mut bad: Vec<f64> = (0..20).map(|i| i as f64).collect();
        bad[3] = f64::INFINITY;
        let mut good: Vec<f64> = (0..20).map(|i| i as f64).collect();
        good[19] = 1_000_000.0;
        let df = df!["bad" => bad, "good" => good].unwrap();

        let outliers = OutlierDetector::detect(&df, &names(&["bad", "good"]));
        assert!(outliers["bad"].is_empty());
        assert!(outliers["good"].contains(&19));
    }

    #[test]
    fn test_missing_column_degrades_to_empty() {
        let df = df!["x" => [1.0, 2.0]].unwrap();
        let outliers = OutlierDetector::detect(&df, &names(&["nope"]));
        assert!(outliers["nope"].is_empty());
    }
}

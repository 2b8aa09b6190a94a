//! Mean-shift drift between a baseline dataset and a new one.
//!
//! This is a first-moment signal only. It does not test significance.

use crate::config::DRIFT_MIN_SAMPLES;
use crate::error::{DoctorError, Result};
use crate::types::{DriftMap, DriftRecord};
use crate::utils::numeric_series;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Compares per-column means between two datasets.
pub struct DriftDetector;

impl DriftDetector {
    /// Columns present in both datasets, in baseline order.
    pub fn shared_columns(baseline: &DataFrame, new: &DataFrame) -> Vec<String> {
        let in_new: HashSet<String> = new.get_column_names().iter().map(|c| c.to_string()).collect();
        baseline
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .filter(|c| in_new.contains(c))
            .collect()
    }

    /// Compute a [`DriftRecord`] per column.
    ///
    /// `columns = None` compares every shared column. Non-numeric columns
    /// coerce to no values and report `insufficient_data`. An explicitly
    /// requested column missing from either side is an error.
    pub fn detect(
        baseline: &DataFrame,
        new: &DataFrame,
        columns: Option<&[String]>,
    ) -> Result<DriftMap> {
        let columns = match columns {
            Some(columns) => columns.to_vec(),
            None => Self::shared_columns(baseline, new),
        };

        let mut drift = DriftMap::with_capacity(columns.len());
        for name in columns {
            let base_values = Self::column_values(baseline, &name)?;
            let new_values = Self::column_values(new, &name)?;

            let record = match (
                Self::sample_mean(&base_values),
                Self::sample_mean(&new_values),
            ) {
                (Some(mean_baseline), Some(mean_new)) => DriftRecord::Computed {
                    mean_baseline,
                    mean_new,
                    mean_diff: mean_new - mean_baseline,
                },
                _ => DriftRecord::insufficient(),
            };
            debug!("drift {}: {:?}", name, record);
            drift.insert(name, record);
        }

        Ok(drift)
    }

    fn column_values(df: &DataFrame, name: &str) -> Result<Series> {
        let column = df
            .column(name)
            .map_err(|_| DoctorError::ColumnNotFound(name.to_string()))?;
        // Columns with no numeric cast path behave like non-numeric text.
        Ok(numeric_series(column.as_materialized_series())
            .unwrap_or_else(|_| Series::new_empty(name.into(), &DataType::Float64)))
    }

    /// Mean of `values`, or `None` below the drift sample floor.
    fn sample_mean(values: &Series) -> Option<f64> {
        if values.len() - values.null_count() < DRIFT_MIN_SAMPLES {
            return None;
        }
        values.mean()
    }
}

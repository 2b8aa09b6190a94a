//! Dataset profiling.
//!
//! - [`SchemaInferrer`]: dtype tag, non-null count and null fraction per column
//! - [`DataProfiler`]: cardinality and numeric summary statistics per column

mod schema;
pub mod statistics;

pub use schema::SchemaInferrer;

use crate::types::{ColumnKind, ColumnProfile, ProfileMap};
use crate::utils::{coerce_numeric, missing_count, numeric_series};
use polars::prelude::*;
use schema::null_fraction;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Data profiler for per-column cardinality and summary statistics.
pub struct DataProfiler;

impl DataProfiler {
    /// Profile every column of a dataset, in column order.
    ///
    /// Never fails: a column that cannot be summarized is reported without
    /// its numeric fields.
    pub fn profile(df: &DataFrame) -> ProfileMap {
        let mut profiles = ProfileMap::with_capacity(df.width());

        for column in df.get_columns() {
            let name = column.name().to_string();
            let profile = Self::profile_column(column.as_materialized_series(), df.height());
            debug!(
                "profile {}: n_unique={}, numeric={}",
                name,
                profile.n_unique,
                profile.has_numeric_summary()
            );
            profiles.insert(name, profile);
        }

        profiles
    }

    fn profile_column(series: &Series, rows: usize) -> ColumnProfile {
        let kind = ColumnKind::from_dtype(series.dtype());
        let non_null = rows.saturating_sub(missing_count(series));

        let mut profile = ColumnProfile {
            n_unique: Self::count_unique(series, kind),
            pct_null: null_fraction(non_null, rows),
            mean: None,
            std: None,
            min: None,
            max: None,
        };

        if kind.is_numeric() {
            match numeric_series(series) {
                Ok(values) => {
                    profile.mean = values.mean();
                    profile.std = statistics::sample_std(&values);
                    profile.min = values.min::<f64>().ok().flatten();
                    profile.max = values.max::<f64>().ok().flatten();
                }
                Err(e) => warn!("Could not coerce '{}' to numeric: {}", series.name(), e),
            }
        }

        profile
    }

    /// Distinct non-missing values.
    fn count_unique(series: &Series, kind: ColumnKind) -> usize {
        if kind.is_numeric()
            && let Ok(values) = coerce_numeric(series)
        {
            // Normalize -0.0 so it matches 0.0.
            return values
                .into_iter()
                .flatten()
                .map(|v| if v == 0.0 { 0u64 } else { v.to_bits() })
                .collect::<HashSet<_>>()
                .len();
        }

        series.drop_nulls().n_unique().unwrap_or_else(|e| {
            warn!("Could not count unique values of '{}': {}", series.name(), e);
            0
        })
    }
}

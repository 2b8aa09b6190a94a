//! Heuristic remediation tags per column.

use crate::config::{HIGH_CARDINALITY_THRESHOLD, NULL_FRACTION_THRESHOLD};
use crate::profiler::DataProfiler;
use crate::types::{ColumnKind, Suggestion, SuggestionMap};
use polars::prelude::*;

/// Derives one [`Suggestion`] per column from null rate and cardinality.
pub struct SuggestionGenerator;

impl SuggestionGenerator {
    /// Tag every column. Drop-or-impute takes precedence over high cardinality.
    pub fn suggest(df: &DataFrame) -> SuggestionMap {
        let profile = DataProfiler::profile(df);

        df.get_columns()
            .iter()
            .filter_map(|column| {
                let name = column.name().to_string();
                let stats = profile.get(&name)?;
                let kind = ColumnKind::from_dtype(column.dtype());
                Some((name, Self::classify(kind, stats.pct_null, stats.n_unique)))
            })
            .collect()
    }

    pub fn classify(kind: ColumnKind, pct_null: f64, n_unique: usize) -> Suggestion {
        if pct_null > NULL_FRACTION_THRESHOLD {
            Suggestion::ConsiderDropOrImpute
        } else if !kind.is_numeric() && n_unique > HIGH_CARDINALITY_THRESHOLD {
            Suggestion::HighCardinality
        } else {
            Suggestion::CleanOk
        }
    }
}

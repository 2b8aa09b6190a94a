//! Per-column type and null-rate inference.

use crate::types::{ColumnKind, ColumnSchema, SchemaMap};
use crate::utils::missing_count;
use polars::prelude::*;
use tracing::debug;

/// Derives a [`ColumnSchema`] for every column of a dataset.
pub struct SchemaInferrer;

impl SchemaInferrer {
    /// Infer the schema of every column, in column order.
    ///
    /// The null fraction uses `max(1, rows)` as denominator, so a zero-row
    /// dataset reports 0.0 for every column.
    pub fn infer(df: &DataFrame) -> SchemaMap {
        let rows = df.height();
        let mut schema = SchemaMap::with_capacity(df.width());

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let missing = missing_count(series);
            let non_null_count = rows.saturating_sub(missing);

            let entry = ColumnSchema {
                dtype: series.dtype().to_string(),
                kind: ColumnKind::from_dtype(series.dtype()),
                non_null_count,
                pct_null: null_fraction(non_null_count, rows),
            };
            debug!(
                "schema {}: {} ({}), pct_null={:.3}",
                column.name(),
                entry.dtype,
                entry.kind.as_str(),
                entry.pct_null
            );
            schema.insert(column.name().to_string(), entry);
        }

        schema
    }
}

/// `1 - non_null / max(1, rows)`
pub(crate) fn null_fraction(non_null: usize, rows: usize) -> f64 {
    1.0 - non_null as f64 / rows.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_null_complete_column() {
        let df = df!["a" => [1.0, 2.0, 3.0]].unwrap();
        let schema = SchemaInferrer::infer(&df);
        assert_eq!(schema["a"].pct_null, 0.0);
        assert_eq!(schema["a"].non_null_count, 3);
        assert_eq!(schema["a"].kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_pct_null_all_missing_column() {
        let df = df!["a" => [None::<f64>, None, None, None]].unwrap();
        let schema = SchemaInferrer::infer(&df);
        assert_eq!(schema["a"].pct_null, 1.0);
        assert_eq!(schema["a"].non_null_count, 0);
    }

    #[test]
    fn test_pct_null_partial() {
        let df = df!["c" => [Some("x"), None, Some("y"), None]].unwrap();
        let schema = SchemaInferrer::infer(&df);
        assert_eq!(schema["c"].pct_null, 0.5);
        assert_eq!(schema["c"].kind, ColumnKind::Text);
    }

    #[test]
    fn test_zero_row_dataset() {
        let df = df!["a" => Vec::<f64>::new(), "b" => Vec::<String>::new()].unwrap();
        let schema = SchemaInferrer::infer(&df);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema["a"].pct_null, 0.0);
        assert_eq!(schema["b"].pct_null, 0.0);
    }

    #[test]
    fn test_column_order_preserved() {
        let df = df!["z" => [1], "a" => [2], "m" => [3]].unwrap();
        let schema = SchemaInferrer::infer(&df);
        let names: Vec<&String> = schema.keys().collect();
        assert_eq!(names, ["z", "a", "m"]);
    }
}

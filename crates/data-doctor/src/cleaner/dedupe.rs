//! First-occurrence duplicate row removal.

use crate::error::{DoctorError, Result};
use crate::types::DedupeMeta;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Removes rows that repeat an earlier row under a key column subset.
pub struct Deduplicator;

impl Deduplicator {
    /// Drop duplicate rows, keeping the first occurrence and the order of the
    /// kept rows. `subset = None` compares all columns. Missing cells compare
    /// equal to each other.
    pub fn dedupe(df: &DataFrame, subset: Option<&[String]>) -> Result<(DataFrame, DedupeMeta)> {
        if let Some(columns) = subset {
            let present: HashSet<String> =
                df.get_column_names().iter().map(|c| c.to_string()).collect();
            if let Some(missing) = columns.iter().find(|c| !present.contains(*c)) {
                return Err(DoctorError::ColumnNotFound(missing.clone()));
            }
        }

        let deduped = df.unique_stable(subset, UniqueKeepStrategy::First, None)?;
        let removed_duplicates = df.height() - deduped.height();
        if removed_duplicates > 0 {
            debug!("Removed {} duplicate rows", removed_duplicates);
        }

        Ok((deduped, DedupeMeta { removed_duplicates }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_duplicates() -> DataFrame {
        df![
            "id" => [1i64, 2, 1, 3, 2],
            "name" => [Some("a"), Some("b"), Some("a"), None, Some("z")],
        ]
        .unwrap()
    }

    #[test]
    fn test_removes_exact_duplicates_keeping_first() {
        let (out, meta) = Deduplicator::dedupe(&with_duplicates(), None).unwrap();
        assert_eq!(meta.removed_duplicates, 1);
        assert_eq!(out.height(), 4);

        let ids: Vec<Option<i64>> = out
            .column("id")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3), Some(2)]);
    }

    #[test]
    fn test_subset_key() {
        let subset = vec!["id".to_string()];
        let (out, meta) = Deduplicator::dedupe(&with_duplicates(), Some(&subset)).unwrap();
        assert_eq!(meta.removed_duplicates, 2);
        let names: Vec<Option<&str>> = out
            .column("name")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(names, vec![Some("a"), Some("b"), None]);
    }

    #[test]
    fn test_missing_cells_compare_equal() {
        let df = df!["x" => [None::<f64>, None, Some(1.0)]].unwrap();
        let (out, meta) = Deduplicator::dedupe(&df, None).unwrap();
        assert_eq!(meta.removed_duplicates, 1);
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_signed_zeros_compare_equal() {
        let df = df!["x" => [0.0, -0.0, 1.0]].unwrap();
        let (out, meta) = Deduplicator::dedupe(&df, None).unwrap();
        assert_eq!(meta.removed_duplicates, 1);
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_idempotent() {
        let (once, _) = Deduplicator::dedupe(&with_duplicates(), None).unwrap();
        let (twice, meta) = Deduplicator::dedupe(&once, None).unwrap();
        assert_eq!(meta.removed_duplicates, 0);
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn test_no_duplicates_returns_same_rows() {
        let df = df!["a" => [1, 2, 3]].unwrap();
        let (out, meta) = Deduplicator::dedupe(&df, None).unwrap();
        assert_eq!(meta.removed_duplicates, 0);
        assert!(out.equals(&df));
    }

    #[test]
    fn test_unknown_subset_column() {
        let subset = vec!["nope".to_string()];
        let err = Deduplicator::dedupe(&with_duplicates(), Some(&subset)).unwrap_err();
        assert!(matches!(err, DoctorError::ColumnNotFound(c) if c == "nope"));
    }
}

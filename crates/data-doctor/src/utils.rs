//! Shared column helpers for the pipeline stages.
//!
//! The coercion helpers here are the one place where a column's cells are
//! turned into plain Rust values. Stages never inspect polars `AnyValue`s
//! directly.

use crate::types::ColumnKind;
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

#[inline]
pub fn is_boolean_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Boolean)
}

#[inline]
fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Type tag of a Series.
pub fn column_kind(series: &Series) -> ColumnKind {
    ColumnKind::from_dtype(series.dtype())
}

/// Names of all columns whose declared dtype is numeric.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

// =============================================================================
// Coercion
// =============================================================================

/// Coerce a Series to numeric values.
///
/// Cells that cannot be represented as a number (unparseable strings, nulls,
/// NaN) become `None`. Errors only when polars has no cast path at all from the
/// column's dtype.
pub fn coerce_numeric(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Float64 copy of a Series with every missing cell (NaN included) as null,
/// ready for polars aggregations.
pub fn numeric_series(series: &Series) -> PolarsResult<Series> {
    Ok(Series::new(series.name().clone(), coerce_numeric(series)?))
}

/// Coerce a Series to owned strings, keeping nulls as `None`.
pub fn coerce_string(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Number of missing cells. Float NaN counts as missing.
pub fn missing_count(series: &Series) -> usize {
    if is_float_dtype(series.dtype())
        && let Ok(values) = coerce_numeric(series)
    {
        return values.iter().filter(|v| v.is_none()).count();
    }
    series.null_count()
}

/// Total missing cells across a DataFrame.
pub fn total_missing(df: &DataFrame) -> usize {
    df.get_columns()
        .iter()
        .map(|c| missing_count(c.as_materialized_series()))
        .sum()
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Most frequent non-null string. Ties resolve to the smallest value.
pub fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(value, _)| value.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Replace every null of a Float64 Series with `fill_value`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<f64> = series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Build a String Series with every missing cell replaced by `fill_value`.
pub fn fill_string_nulls(name: PlSmallStr, values: &[Option<String>], fill_value: &str) -> Series {
    let filled: Vec<String> = values
        .iter()
        .map(|v| v.clone().unwrap_or_else(|| fill_value.to_string()))
        .collect();
    Series::new(name, filled)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_is_datetime_dtype() {
        assert!(is_datetime_dtype(&DataType::Date));
        assert!(is_datetime_dtype(&DataType::Datetime(
            TimeUnit::Milliseconds,
            None
        )));
        assert!(!is_datetime_dtype(&DataType::String));
    }

    #[test]
    fn test_coerce_numeric_strings() {
        let series = Series::new("s".into(), &[Some("1.5"), Some("abc"), None, Some("4")]);
        let values = coerce_numeric(&series).unwrap();
        assert_eq!(values, vec![Some(1.5), None, None, Some(4.0)]);
    }

    #[test]
    fn test_coerce_numeric_treats_nan_as_missing() {
        let series = Series::new("f".into(), &[Some(1.0), Some(f64::NAN), None]);
        assert_eq!(coerce_numeric(&series).unwrap(), vec![Some(1.0), None, None]);
        assert_eq!(missing_count(&series), 2);
    }

    #[test]
    fn test_coerce_string_keeps_nulls() {
        let series = Series::new("i".into(), &[Some(1i64), None, Some(3)]);
        let values = coerce_string(&series).unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None, Some("3".to_string())]);
    }

    #[test]
    fn test_numeric_column_names() {
        let df = df![
            "a" => [1i64, 2],
            "b" => ["x", "y"],
            "c" => [0.5, 1.5],
        ]
        .unwrap();
        assert_eq!(numeric_column_names(&df), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_string_mode() {
        let values: Vec<Option<String>> = ["a", "b", "a", "c", "a"]
            .iter()
            .map(|s| Some(s.to_string()))
            .collect();
        assert_eq!(string_mode(&values), Some("a".to_string()));
    }

    #[test]
    fn test_string_mode_tie_prefers_smallest() {
        let values = vec![
            Some("pear".to_string()),
            Some("apple".to_string()),
            None,
            Some("pear".to_string()),
            Some("apple".to_string()),
        ];
        assert_eq!(string_mode(&values), Some("apple".to_string()));
        assert_eq!(string_mode(&[None, None]), None);
    }

    #[test]
    fn test_numeric_series_nulls_nan_and_text() {
        let series = Series::new("s".into(), &[Some("2.5"), Some("NaN"), Some("x"), None]);
        let numeric = numeric_series(&series).unwrap();
        assert_eq!(numeric.dtype(), &DataType::Float64);
        assert_eq!(numeric.name().as_str(), "s");
        assert_eq!(numeric.null_count(), 3);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 2.0).unwrap();
        let values: Vec<Option<f64>> = filled.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_fill_string_nulls() {
        let filled = fill_string_nulls("c".into(), &[None, Some("b".to_string())], "__MISSING__");
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.str().unwrap().get(0), Some("__MISSING__"));
    }
}

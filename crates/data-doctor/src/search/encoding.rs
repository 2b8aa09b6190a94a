//! Train/validation split and feature encoding for the surrogate model.

use crate::config::UNKNOWN_CATEGORY_CODE;
use crate::error::{DoctorError, Result};
use crate::utils::{coerce_numeric, coerce_string};
use polars::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Row positions of each side of a seeded shuffle split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

impl Split {
    /// Shuffle `0..n_rows` with `seed`; the first `ceil(n * fraction)` rows
    /// validate, the rest train.
    pub fn shuffled(n_rows: usize, validation_fraction: f64, seed: u64) -> Result<Self> {
        let n_validation = (n_rows as f64 * validation_fraction).ceil() as usize;
        if n_validation == 0 || n_validation >= n_rows {
            return Err(DoctorError::EvaluationFailed(format!(
                "cannot split {} rows into train and validation sets",
                n_rows
            )));
        }

        let mut order: Vec<usize> = (0..n_rows).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        let train = order.split_off(n_validation);

        Ok(Self {
            train,
            validation: order,
        })
    }

    pub fn select<T: Clone>(&self, values: &[T]) -> (Vec<T>, Vec<T>) {
        (
            self.train.iter().map(|&i| values[i].clone()).collect(),
            self.validation.iter().map(|&i| values[i].clone()).collect(),
        )
    }
}

/// Row-major feature matrices for both sides of a split.
#[derive(Debug, Clone, Default)]
pub struct EncodedFeatures {
    pub train: Vec<Vec<f64>>,
    pub validation: Vec<Vec<f64>>,
}

/// Encode every column of `features` as floats.
///
/// Numeric columns pass through with missing cells as 0. Other columns get
/// integer codes in order of first appearance among the training rows;
/// validation values never seen in training map to
/// [`UNKNOWN_CATEGORY_CODE`].
pub fn encode_features(features: &DataFrame, split: &Split) -> Result<EncodedFeatures> {
    let mut encoded = EncodedFeatures {
        train: vec![Vec::with_capacity(features.width()); split.train.len()],
        validation: vec![Vec::with_capacity(features.width()); split.validation.len()],
    };

    for column in features.get_columns() {
        let series = column.as_materialized_series();
        let (train, validation) = if crate::utils::column_kind(series).is_numeric() {
            let values: Vec<f64> = coerce_numeric(series)?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            split.select(&values)
        } else {
            encode_categories(&coerce_string(series)?, split)
        };

        for (row, value) in encoded.train.iter_mut().zip(train) {
            row.push(value);
        }
        for (row, value) in encoded.validation.iter_mut().zip(validation) {
            row.push(value);
        }
    }

    Ok(encoded)
}

fn encode_categories(values: &[Option<String>], split: &Split) -> (Vec<f64>, Vec<f64>) {
    let mut codes: HashMap<Option<&str>, f64> = HashMap::new();

    let train = split
        .train
        .iter()
        .map(|&i| {
            let next = codes.len() as f64;
            *codes.entry(values[i].as_deref()).or_insert(next)
        })
        .collect();

    let validation = split
        .validation
        .iter()
        .map(|&i| {
            codes
                .get(&values[i].as_deref())
                .copied()
                .unwrap_or(UNKNOWN_CATEGORY_CODE)
        })
        .collect();

    (train, validation)
}

/// Class indices in order of first appearance over all rows.
///
/// Fails when any label is missing.
pub fn encode_labels(series: &Series) -> Result<(Vec<usize>, usize)> {
    let mut classes: HashMap<String, usize> = HashMap::new();
    let mut labels = Vec::with_capacity(series.len());

    for value in coerce_string(series)? {
        let value = value.ok_or_else(|| {
            DoctorError::EvaluationFailed(format!(
                "target column '{}' has missing labels",
                series.name()
            ))
        })?;
        let next = classes.len();
        labels.push(*classes.entry(value).or_insert(next));
    }

    Ok((labels, classes.len()))
}

/// Continuous targets. Fails when any cell is missing or non-numeric.
pub fn encode_continuous(series: &Series) -> Result<Vec<f64>> {
    coerce_numeric(series)?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                DoctorError::EvaluationFailed(format!(
                    "target column '{}' is not numeric",
                    series.name()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Split ====================

    #[test]
    fn test_split_sizes() {
        let split = Split::shuffled(100, 0.25, 42).unwrap();
        assert_eq!(split.validation.len(), 25);
        assert_eq!(split.train.len(), 75);

        let split = Split::shuffled(30, 0.25, 42).unwrap();
        assert_eq!(split.validation.len(), 8);
    }

    #[test]
    fn test_split_is_partition_and_deterministic() {
        let a = Split::shuffled(40, 0.25, 7).unwrap();
        let b = Split::shuffled(40, 0.25, 7).unwrap();
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.train.iter().chain(&a.validation).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_too_small() {
        assert!(Split::shuffled(1, 0.25, 42).is_err());
        assert!(Split::shuffled(0, 0.25, 42).is_err());
    }

    // ==================== Encoding ====================

    #[test]
    fn test_unseen_category_gets_unknown_code() {
        let split = Split {
            train: vec![0, 1, 2],
            validation: vec![3, 4],
        };
        let df = df![
            "num" => [Some(1.5), None, Some(3.0), Some(4.0), Some(5.0)],
            "cat" => ["b", "a", "b", "a", "z"],
        ]
        .unwrap();

        let encoded = encode_features(&df, &split).unwrap();
        assert_eq!(encoded.train, vec![vec![1.5, 0.0], vec![0.0, 1.0], vec![3.0, 0.0]]);
        assert_eq!(encoded.validation, vec![vec![4.0, 1.0], vec![5.0, UNKNOWN_CATEGORY_CODE]]);
    }

    #[test]
    fn test_encode_labels() {
        let series = Series::new("y".into(), &[1i64, 0, 1, 2]);
        let (labels, n_classes) = encode_labels(&series).unwrap();
        assert_eq!(labels, vec![0, 1, 0, 2]);
        assert_eq!(n_classes, 3);

        let missing = Series::new("y".into(), &[Some("a"), None]);
        assert!(encode_labels(&missing).is_err());
    }

    #[test]
    fn test_encode_continuous_rejects_text() {
        let text = Series::new("y".into(), &["low", "high"]);
        let err = encode_continuous(&text).unwrap_err();
        assert!(err.to_string().contains("not numeric"));

        let numbers = Series::new("y".into(), &[1i64, 2]);
        assert_eq!(encode_continuous(&numbers).unwrap(), vec![1.0, 2.0]);
    }
}

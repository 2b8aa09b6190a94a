//! Mean / median / most-frequent / constant imputation.

use crate::config::{CategoricalStrategy, MISSING_TOKEN, NumericStrategy};
use crate::error::{Result, ResultExt};
use crate::types::{ColumnKind, ImputationMeta, ImputationStrategy, StrategyPair};
use crate::utils::{
    coerce_string, fill_numeric_nulls, fill_string_nulls, numeric_series, string_mode,
};
use polars::prelude::*;
use tracing::{debug, warn};

enum Fill {
    /// No observed value to derive a fill from.
    Unavailable,
    /// Nothing missing.
    Complete,
    Filled(Series),
}

/// Fills missing values column by column with a per-type strategy.
///
/// Numeric columns (by declared dtype) use the numeric strategy; every other
/// column is treated as categorical. The input frame is never modified.
pub struct Imputer;

impl Imputer {
    /// Impute with an explicit strategy pair.
    pub fn impute_with(df: &DataFrame, pair: StrategyPair) -> Result<(DataFrame, ImputationMeta)> {
        Self::impute(df, pair.numeric, pair.categorical)
    }

    /// Return an imputed copy of `df` and the strategy applied per column.
    ///
    /// Columns without missing values keep their dtype and are recorded with
    /// the strategy that would apply. A column with no observed value to
    /// derive a fill from (all missing under mean, median or most_frequent) is
    /// left as is and not recorded.
    pub fn impute(
        df: &DataFrame,
        numeric: NumericStrategy,
        categorical: CategoricalStrategy,
    ) -> Result<(DataFrame, ImputationMeta)> {
        let mut imputed = df.clone();
        let mut meta = ImputationMeta::new();

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let name = series.name().clone();

            let (outcome, strategy) = if ColumnKind::from_dtype(series.dtype()).is_numeric() {
                (Self::fill_numeric(series, numeric), ImputationStrategy::from(numeric))
            } else {
                (
                    Self::fill_categorical(series, categorical),
                    ImputationStrategy::from(categorical),
                )
            };

            match outcome {
                Ok(Fill::Filled(filled)) => {
                    imputed
                        .replace(name.as_str(), filled)
                        .context(format!("Replacing imputed column '{}'", name))?;
                    meta.insert(name.to_string(), strategy);
                }
                Ok(Fill::Complete) => {
                    meta.insert(name.to_string(), strategy);
                }
                Ok(Fill::Unavailable) => debug!("No fill value for '{}', left unimputed", name),
                Err(e) => warn!("Could not impute '{}': {}", name, e),
            }
        }

        Ok((imputed, meta))
    }

    fn fill_numeric(series: &Series, strategy: NumericStrategy) -> Result<Fill> {
        let values = numeric_series(series)?;

        let fill_value = match strategy {
            NumericStrategy::Mean => values.mean(),
            NumericStrategy::Median => values.median(),
        };
        let Some(fill_value) = fill_value else {
            return Ok(Fill::Unavailable);
        };

        if values.null_count() == 0 {
            return Ok(Fill::Complete);
        }

        debug!("Filling '{}' with {} {:.4}", series.name(), strategy.as_str(), fill_value);
        Ok(Fill::Filled(fill_numeric_nulls(&values, fill_value)?))
    }

    fn fill_categorical(
        series: &Series,
        strategy: CategoricalStrategy,
    ) -> Result<Fill> {
        let values = coerce_string(series)?;

        let fill_value = match strategy {
            CategoricalStrategy::MostFrequent => string_mode(&values),
            CategoricalStrategy::Constant => Some(MISSING_TOKEN.to_string()),
        };
        let Some(fill_value) = fill_value else {
            return Ok(Fill::Unavailable);
        };

        if values.iter().all(Option::is_some) {
            return Ok(Fill::Complete);
        }

        debug!("Filling '{}' with {} '{}'", series.name(), strategy.as_str(), fill_value);
        Ok(Fill::Filled(fill_string_nulls(
            series.name().clone(),
            &values,
            &fill_value,
        )))
    }
}

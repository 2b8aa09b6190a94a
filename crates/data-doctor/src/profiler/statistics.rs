//! Summary statistics over numeric Series.
//!
//! Inputs are the Float64 Series built by [`numeric_series`], where NaN and
//! unparseable cells are already nulls. Polars skips nulls in every
//! aggregation, so these return `None` when no value is left.
//!
//! [`numeric_series`]: crate::utils::numeric_series

use polars::prelude::*;

/// Sample standard deviation (ddof = 1). A single value has std 0.0.
pub fn sample_std(values: &Series) -> Option<f64> {
    match values.len() - values.null_count() {
        0 => None,
        1 => Some(0.0),
        _ => values.std(1),
    }
}

/// Linearly interpolated quantile, `q` in `[0, 1]`.
pub fn quantile(values: &Series, q: f64) -> PolarsResult<Option<f64>> {
    let scalar = values.quantile_reduce(q.clamp(0.0, 1.0), QuantileMethod::Linear)?;
    Ok(scalar.value().extract::<f64>())
}

/// Mean squared error between paired predictions and observations.
pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return None;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    Some(sum / predicted.len() as f64)
}

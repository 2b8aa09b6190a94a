//! Imputation strategy search.
//!
//! Every numeric/categorical pairing is scored by imputing the dataset,
//! training a random forest on a seeded train split and measuring it on the
//! validation split. Classification scores accuracy; regression scores
//! negative mean squared error, so higher is always better.
//!
//! A pairing that fails to evaluate is recorded as failed and the search
//! moves on. Only a missing or undersized target column aborts the search.

mod encoding;
mod forest;

pub use encoding::{EncodedFeatures, Split, encode_continuous, encode_features, encode_labels};
pub use forest::{ForestParams, RandomForest};

use crate::config::{
    ProblemType, RANDOM_SEED, SEARCH_MIN_TARGET_ROWS, SURROGATE_MAX_DEPTH, SURROGATE_TREES,
    VALIDATION_FRACTION,
};
use crate::error::{DoctorError, Result};
use crate::imputers::Imputer;
use crate::profiler::statistics;
use crate::types::{BestStrategy, EvaluationOutcome, SearchResult, StrategyEvaluation, StrategyPair};
use crate::utils::missing_count;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Searches the imputation pairings for the best downstream model score.
pub struct ImputationStrategySearch;

impl ImputationStrategySearch {
    fn forest_params() -> ForestParams {
        ForestParams {
            n_trees: SURROGATE_TREES,
            max_depth: SURROGATE_MAX_DEPTH,
            seed: RANDOM_SEED,
        }
    }

    /// Evaluate all four pairings against `target`.
    pub fn run(df: &DataFrame, target: &str, problem_type: ProblemType) -> Result<SearchResult> {
        Self::check_target(df, target)?;

        info!(
            "Searching imputation strategies for target '{}' ({})",
            target, problem_type
        );

        let results: Vec<StrategyEvaluation> = StrategyPair::all()
            .into_iter()
            .map(|pair| {
                let outcome = match Self::evaluate(df, target, problem_type, pair) {
                    Ok(score) => {
                        debug!("Strategy {} scored {:.4}", pair, score);
                        EvaluationOutcome::Scored { score }
                    }
                    Err(e) => {
                        warn!("Strategy {} failed: {}", pair, e);
                        EvaluationOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                StrategyEvaluation { pair, outcome }
            })
            .collect();

        let best = Self::select_best(&results);
        match &best {
            Some(b) => info!("Best imputation strategy: {} ({:.4})", b.pair, b.score),
            None => warn!("No imputation strategy could be evaluated"),
        }

        Ok(SearchResult {
            target_column: target.to_string(),
            problem_type,
            best,
            results,
        })
    }

    /// First evaluation with the strictly highest score.
    pub fn select_best(results: &[StrategyEvaluation]) -> Option<BestStrategy> {
        results
            .iter()
            .filter_map(|r| r.score().filter(|s| !s.is_nan()).map(|score| (r.pair, score)))
            .fold(None, |best: Option<BestStrategy>, (pair, score)| match best {
                Some(b) if b.score >= score => Some(b),
                _ => Some(BestStrategy { pair, score }),
            })
    }

    fn check_target(df: &DataFrame, target: &str) -> Result<()> {
        let column = df
            .column(target)
            .map_err(|_| DoctorError::ColumnNotFound(target.to_string()))?;

        let series = column.as_materialized_series();
        let found = series.len() - missing_count(series);
        if found < SEARCH_MIN_TARGET_ROWS {
            return Err(DoctorError::InsufficientData {
                column: target.to_string(),
                found,
                required: SEARCH_MIN_TARGET_ROWS,
            });
        }
        Ok(())
    }

    fn evaluate(
        df: &DataFrame,
        target: &str,
        problem_type: ProblemType,
        pair: StrategyPair,
    ) -> Result<f64> {
        let (imputed, _) = Imputer::impute_with(df, pair)?;

        let target_series = imputed.column(target)?.as_materialized_series().clone();
        let features = imputed.drop(target)?;

        let split = Split::shuffled(imputed.height(), VALIDATION_FRACTION, RANDOM_SEED)?;
        let encoded = encode_features(&features, &split)?;

        match problem_type {
            ProblemType::Classification => {
                let (labels, n_classes) = encode_labels(&target_series)?;
                let (train_y, validation_y) = split.select(&labels);

                let forest = RandomForest::fit_classifier(
                    &encoded.train,
                    &train_y,
                    n_classes,
                    Self::forest_params(),
                )?;
                let predicted = forest.predict_classes(&encoded.validation);

                let correct = predicted
                    .iter()
                    .zip(&validation_y)
                    .filter(|(p, a)| p == a)
                    .count();
                Ok(correct as f64 / validation_y.len() as f64)
            }
            ProblemType::Regression => {
                let y = encode_continuous(&target_series)?;
                let (train_y, validation_y) = split.select(&y);

                let forest =
                    RandomForest::fit_regressor(&encoded.train, &train_y, Self::forest_params())?;
                let predicted = forest.predict_values(&encoded.validation);

                statistics::mean_squared_error(&predicted, &validation_y)
                    .map(|mse| -mse)
                    .ok_or_else(|| {
                        DoctorError::EvaluationFailed("validation split is empty".to_string())
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoricalStrategy, NumericStrategy};

    fn scored(numeric: NumericStrategy, categorical: CategoricalStrategy, score: f64) -> StrategyEvaluation {
        StrategyEvaluation {
            pair: StrategyPair::new(numeric, categorical),
            outcome: EvaluationOutcome::Scored { score },
        }
    }

    // ==================== Target checks ====================

    #[test]
    fn test_missing_target_column() {
        let df = df!["x" => [1.0, 2.0]].unwrap();
        let err = ImputationStrategySearch::run(&df, "y", ProblemType::Classification).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_too_few_target_values_fails_fast() {
        let y: Vec<Option<i64>> = (0..100).map(|i| (i < 29).then_some(i % 2)).collect();
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let df = df!["x" => x, "y" => y].unwrap();

        let err = ImputationStrategySearch::run(&df, "y", ProblemType::Classification).unwrap_err();
        match err {
            DoctorError::InsufficientData {
                column,
                found,
                required,
            } => {
                assert_eq!(column, "y");
                assert_eq!(found, 29);
                assert_eq!(required, 30);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ==================== Reproducibility ====================

    fn mixed_features() -> DataFrame {
        let segments = ["north", "south", "east"];
        let x: Vec<Option<f64>> = (0..120)
            .map(|i| (i % 7 != 0).then_some((i % 40) as f64 * 1.5))
            .collect();
        let segment: Vec<Option<&str>> = (0..120)
            .map(|i| (i % 11 != 0).then_some(segments[i % 3]))
            .collect();
        let label: Vec<i64> = (0..120).map(|i| ((i % 40 > 20) as i64) ^ ((i % 3 == 0) as i64)).collect();
        df!["x" => x, "segment" => segment, "label" => label].unwrap()
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let df = mixed_features();
        for problem_type in [ProblemType::Classification, ProblemType::Regression] {
            let first = ImputationStrategySearch::run(&df, "label", problem_type).unwrap();
            let second = ImputationStrategySearch::run(&df, "label", problem_type).unwrap();

            assert_eq!(first.results.len(), 4);
            assert!(
                first
                    .results
                    .iter()
                    .all(|r| matches!(r.outcome, EvaluationOutcome::Scored { .. }))
            );
            assert_eq!(first, second);
        }
    }

    // ==================== Selection ====================

    #[test]
    fn test_select_best_first_strict_maximum() {
        use CategoricalStrategy::*;
        use NumericStrategy::*;

        let results = vec![
            scored(Mean, MostFrequent, 0.8),
            scored(Mean, Constant, 0.9),
            scored(Median, MostFrequent, 0.9),
            StrategyEvaluation {
                pair: StrategyPair::new(Median, Constant),
                outcome: EvaluationOutcome::Failed {
                    reason: "boom".to_string(),
                },
            },
        ];

        let best = ImputationStrategySearch::select_best(&results).unwrap();
        assert_eq!(best.pair, StrategyPair::new(Mean, Constant));
        assert_eq!(best.score, 0.9);
    }

    #[test]
    fn test_select_best_none_when_all_failed() {
        let results = vec![StrategyEvaluation {
            pair: StrategyPair::new(NumericStrategy::Mean, CategoricalStrategy::MostFrequent),
            outcome: EvaluationOutcome::Failed {
                reason: "boom".to_string(),
            },
        }];
        assert!(ImputationStrategySearch::select_best(&results).is_none());
    }

    // ==================== Full search ====================

    #[test]
    fn test_median_beats_mean_when_mean_collides_with_signal() {
        // Mean of observed x is exactly 100, the value that marks class 1.
        // Mean imputation therefore blurs the class boundary; median (0) keeps it.
        let mut x: Vec<Option<f64>> = Vec::new();
        let mut label: Vec<i64> = Vec::new();
        for _ in 0..30 {
            x.push(Some(100.0));
            label.push(1);
        }
        for _ in 0..80 {
            x.push(Some(0.0));
            label.push(0);
        }
        for _ in 0..10 {
            x.push(Some(900.0));
            label.push(0);
        }
        for _ in 0..40 {
            x.push(None);
            label.push(0);
        }
        let df = df!["x" => x, "label" => label].unwrap();

        let result =
            ImputationStrategySearch::run(&df, "label", ProblemType::Classification).unwrap();

        assert_eq!(result.results.len(), 4);
        assert!(result.results.iter().all(|r| r.score().is_some()));

        let best = result.best.unwrap();
        assert_eq!(
            best.pair,
            StrategyPair::new(NumericStrategy::Median, CategoricalStrategy::MostFrequent)
        );
        assert_eq!(best.score, 1.0);
    }

    #[test]
    fn test_regression_scores_are_negative_mse() {
        let x: Vec<Option<f64>> = (0..60).map(|i| (i % 10 != 0).then_some(i as f64)).collect();
        let y: Vec<f64> = (0..60).map(|i| 2.0 * i as f64).collect();
        let df = df!["x" => x, "y" => y].unwrap();

        let result = ImputationStrategySearch::run(&df, "y", ProblemType::Regression).unwrap();
        assert_eq!(result.problem_type, ProblemType::Regression);
        for evaluation in &result.results {
            let score = evaluation.score().unwrap();
            assert!(score <= 0.0);
        }
        assert!(result.best.is_some());
    }

    #[test]
    fn test_text_regression_target_fails_every_pairing() {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Vec<&str> = (0..40).map(|i| if i % 2 == 0 { "low" } else { "high" }).collect();
        let df = df!["x" => x, "y" => y].unwrap();

        let result = ImputationStrategySearch::run(&df, "y", ProblemType::Regression).unwrap();
        assert_eq!(result.results.len(), 4);
        assert!(result
            .results
            .iter()
            .all(|r| matches!(r.outcome, EvaluationOutcome::Failed { .. })));
        assert!(result.best.is_none());
    }
}

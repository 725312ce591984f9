//! Mean and standard deviation of fold evaluations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, XGBoostError};
use crate::core::types::Evaluation;

/// One metric aggregated over the folds of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetric {
    /// `<dataset>-<metric>`
    pub key: String,
    /// Mean over folds
    pub mean: f32,
    /// Standard deviation over folds
    pub std: f32,
}

/// Aggregate with the population standard deviation.
pub fn aggregate(results: &[Evaluation]) -> Result<Vec<AggregatedMetric>> {
    aggregate_with_ddof(results, 0)
}

/// Aggregate with `ddof` delta degrees of freedom, i.e. the variance is
/// divided by `n - ddof`.
///
/// Keys keep the order in which they first appear.
pub fn aggregate_with_ddof(results: &[Evaluation], ddof: usize) -> Result<Vec<AggregatedMetric>> {
    let mut series: IndexMap<String, Vec<f64>> = IndexMap::new();
    for evaluation in results {
        for (data_name, metrics) in evaluation {
            for (metric_name, value) in metrics {
                let parsed = value.trim().parse::<f64>().map_err(|_| {
                    XGBoostError::parse(format!(
                        "value {value:?} of {data_name}-{metric_name} is not a number"
                    ))
                })?;
                series
                    .entry(format!("{data_name}-{metric_name}"))
                    .or_default()
                    .push(parsed);
            }
        }
    }

    series
        .into_iter()
        .map(|(key, values)| {
            let count = values.len();
            if count <= ddof {
                return Err(XGBoostError::invalid_parameter(
                    "ddof",
                    ddof.to_string(),
                    format!("must be smaller than the {count} values of {key}"),
                ));
            }
            let mean = values.iter().sum::<f64>() / count as f64;
            let squares = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>();
            let std = (squares / (count - ddof) as f64).sqrt();
            Ok(AggregatedMetric {
                key,
                mean: mean as f32,
                std: std as f32,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn fold(train: f32, test: f32) -> Evaluation {
        let mut evaluation = Evaluation::new();
        evaluation
            .entry("data-train".to_string())
            .or_default()
            .insert("rmse".to_string(), train.to_string());
        evaluation
            .entry("data-test".to_string())
            .or_default()
            .insert("rmse".to_string(), test.to_string());
        evaluation
    }

    #[test]
    fn test_population_std() {
        let results = [fold(1.0, 2.0), fold(2.0, 4.0), fold(3.0, 6.0)];
        let metrics = aggregate(&results).unwrap();

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].key, "data-train-rmse");
        assert_relative_eq!(metrics[0].mean, 2.0);
        assert_relative_eq!(metrics[0].std, (2.0f32 / 3.0).sqrt(), epsilon = 1e-6);
        assert_eq!(metrics[1].key, "data-test-rmse");
        assert_relative_eq!(metrics[1].mean, 4.0);
    }

    #[test]
    fn test_sample_std() {
        let results = [fold(1.0, 0.0), fold(3.0, 0.0)];
        let metrics = aggregate_with_ddof(&results, 1).unwrap();
        assert_relative_eq!(metrics[0].std, 2.0f32.sqrt(), epsilon = 1e-6);
        assert_relative_eq!(metrics[1].std, 0.0);
    }

    #[test]
    fn test_ddof_too_large() {
        let err = aggregate_with_ddof(&[fold(1.0, 1.0)], 1).unwrap_err();
        assert_eq!(err.category(), "invalid_parameter");
    }

    #[test]
    fn test_unparsable_value() {
        let mut evaluation = fold(1.0, 1.0);
        evaluation["data-test"].insert("rmse".to_string(), "nope".to_string());
        assert_eq!(aggregate(&[evaluation]).unwrap_err().category(), "parse");
    }

    proptest! {
        #[test]
        fn prop_order_insensitive(values in prop::collection::vec((0.0f32..100.0, 0.0f32..100.0), 1..10)) {
            let results: Vec<Evaluation> = values.iter().map(|&(a, b)| fold(a, b)).collect();
            let mut reversed = results.clone();
            reversed.reverse();

            let forward = aggregate(&results).unwrap();
            let backward = aggregate(&reversed).unwrap();
            for (left, right) in forward.iter().zip(&backward) {
                prop_assert_eq!(&left.key, &right.key);
                prop_assert!((left.mean - right.mean).abs() <= 1e-3);
                prop_assert!((left.std - right.std).abs() <= 1e-3);
            }
        }
    }
}

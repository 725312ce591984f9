//! Parsing of the native per-iteration evaluation string.
//!
//! `XGBoosterEvalOneIter` returns a single line such as
//! `[3]\ttrain-rmse:0.21\ttest-rmse:0.25`. Every token after the iteration
//! marker is `<dataset>-<metric>:<value>`. Both dataset and metric names may
//! contain hyphens, so the dataset part is resolved against known names
//! before falling back to the last hyphen.

use indexmap::IndexMap;

use crate::core::error::{Result, XGBoostError};
use crate::core::types::Evaluation;

/// Parse an evaluation string without knowing the evaluated dataset names.
///
/// Dataset names resolved by earlier tokens are reused for later ones, so
/// `train-error` followed by `train-custom-metric` yields one `train` entry
/// with the metrics `error` and `custom-metric`.
pub fn parse_evaluation(output: &str) -> Result<Evaluation> {
    parse_evaluation_with_names(output, &[])
}

/// Parse an evaluation string, preferring the longest matching dataset name.
pub fn parse_evaluation_with_names(output: &str, names: &[&str]) -> Result<Evaluation> {
    let mut results = Evaluation::new();

    for token in output.split_whitespace().skip(1) {
        let (key, value) = token
            .rsplit_once(':')
            .ok_or_else(|| XGBoostError::parse(format!("evaluation token {token:?} has no value")))?;

        let (dataset, metric) = split_key(key, names, &results)
            .ok_or_else(|| XGBoostError::parse(format!("evaluation token {token:?} has no dataset name")))?;

        results
            .entry(dataset.to_string())
            .or_insert_with(IndexMap::new)
            .insert(metric.to_string(), value.to_string());
    }

    Ok(results)
}

fn split_key<'a>(key: &'a str, names: &[&str], seen: &Evaluation) -> Option<(&'a str, &'a str)> {
    let split_at = longest_prefix(key, names.iter().copied())
        .or_else(|| longest_prefix(key, seen.keys().map(String::as_str)))
        .or_else(|| key.rfind('-'))?;

    let (dataset, metric) = (&key[..split_at], &key[split_at + 1..]);
    if dataset.is_empty() || metric.is_empty() {
        return None;
    }
    Some((dataset, metric))
}

/// Length of the longest candidate that prefixes `key` as `<candidate>-`.
fn longest_prefix<'n>(key: &str, candidates: impl Iterator<Item = &'n str>) -> Option<usize> {
    candidates
        .filter(|name| {
            key.len() > name.len() + 1
                && key.starts_with(*name)
                && key.as_bytes()[name.len()] == b'-'
        })
        .map(str::len)
        .max()
}

/// Render an evaluation as `dataset-metric:value` tokens.
pub fn format_evaluation(evaluation: &Evaluation) -> String {
    evaluation
        .iter()
        .flat_map(|(dataset, metrics)| {
            metrics
                .iter()
                .map(move |(metric, value)| format!("{dataset}-{metric}:{value}"))
        })
        .collect::<Vec<_>>()
        .join("\t")
}

/// Numeric value of a metric.
pub fn metric_value(evaluation: &Evaluation, dataset: &str, metric: &str) -> Result<f32> {
    let metrics = evaluation.get(dataset).ok_or_else(|| {
        XGBoostError::evaluation(format!("Name of DMatrix {dataset} not found in evaluation"))
    })?;
    let value = metrics.get(metric).ok_or_else(|| {
        XGBoostError::evaluation(format!("Name of metric {metric} not found in evaluation"))
    })?;
    value.parse::<f32>().map_err(|_| {
        XGBoostError::parse(format!("metric {dataset}-{metric} has non-numeric value {value:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphenated_metric_names() {
        let evaluation = parse_evaluation("[0]\ttrain-error:0.1\ttrain-custom-metric:0.2").unwrap();
        assert_eq!(evaluation.len(), 1);
        assert_eq!(evaluation["train"]["error"], "0.1");
        assert_eq!(evaluation["train"]["custom-metric"], "0.2");
    }

    #[test]
    fn test_known_names_win() {
        let evaluation = parse_evaluation_with_names(
            "[4]\tdata-train-rmse:0.3\tdata-test-rmse:0.4\tdata-test-map@5:0.9",
            &["data-train", "data-test"],
        )
        .unwrap();
        assert_eq!(evaluation["data-train"]["rmse"], "0.3");
        assert_eq!(evaluation["data-test"]["rmse"], "0.4");
        assert_eq!(evaluation["data-test"]["map@5"], "0.9");
    }

    #[test]
    fn test_longest_name_wins() {
        let evaluation =
            parse_evaluation_with_names("[0]\ta-b-auc:0.5", &["a", "a-b"]).unwrap();
        assert_eq!(evaluation["a-b"]["auc"], "0.5");
    }

    #[test]
    fn test_last_hyphen_fallback() {
        let evaluation = parse_evaluation("[0]\tvalid-set-logloss:0.69").unwrap();
        assert_eq!(evaluation["valid-set"]["logloss"], "0.69");
    }

    #[test]
    fn test_value_split_on_last_colon() {
        let evaluation = parse_evaluation("[1]\ttest-error@0.7:0.1").unwrap();
        assert_eq!(evaluation["test"]["error@0.7"], "0.1");
    }

    #[test]
    fn test_only_marker() {
        assert!(parse_evaluation("[7]").unwrap().is_empty());
        assert!(parse_evaluation("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(parse_evaluation("[0]\ttrain-error").unwrap_err().category(), "parse");
        assert_eq!(parse_evaluation("[0]\terror:0.1").unwrap_err().category(), "parse");
        assert!(parse_evaluation("[0]\t-error:0.1").is_err());
    }

    #[test]
    fn test_format_and_lookup() {
        let evaluation = parse_evaluation("[0]\ttrain-rmse:0.5\ttest-rmse:0.75").unwrap();
        assert_eq!(format_evaluation(&evaluation), "train-rmse:0.5\ttest-rmse:0.75");
        assert_eq!(metric_value(&evaluation, "test", "rmse").unwrap(), 0.75);
        assert_eq!(
            metric_value(&evaluation, "valid", "rmse").unwrap_err().category(),
            "evaluation"
        );
        assert_eq!(
            metric_value(&evaluation, "train", "auc").unwrap_err().category(),
            "evaluation"
        );
    }
}

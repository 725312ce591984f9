//! Feature importance from text model dumps.
//!
//! Split lines of a text dump look like
//! `0:[f2<0.5] yes=1,no=2,missing=1,gain=12.5,cover=40`; leaves carry no
//! `[`. Importance counts splits per feature and, for gain and cover, sums
//! the statistic read after `<stat>=` up to the next comma.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, XGBoostError};
use crate::core::types::{ImportanceType, ModelFormat};

/// Importance scores keyed by feature id or name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    /// Number of splits using each feature
    pub weights: IndexMap<String, usize>,
    /// Gain or cover per feature, `None` for weight importance
    pub gains: Option<IndexMap<String, f32>>,
}

/// Split descriptor of a dump line: the feature id and the text after `]`.
fn split_descriptor(line: &str) -> Option<(&str, &str)> {
    let (_, rest) = line.split_once('[')?;
    let (condition, statistics) = rest.split_once(']').unwrap_or((rest, ""));
    let feature = condition.split('<').next().unwrap_or(condition);
    Some((feature, statistics))
}

/// Count splits per feature over every tree.
pub fn weight_importance<S: AsRef<str>>(trees: &[S]) -> IndexMap<String, usize> {
    let mut weights = IndexMap::new();
    for tree in trees {
        for (feature, _) in tree.as_ref().lines().filter_map(split_descriptor) {
            *weights.entry(feature.to_string()).or_insert(0) += 1;
        }
    }
    weights
}

/// Sum a split statistic per feature over every tree, optionally averaged
/// over the number of splits.
pub fn stat_importance<S: AsRef<str>>(trees: &[S], statistic: &str, average: bool) -> Result<FeatureScore> {
    let separator = format!("{statistic}=");
    let mut weights: IndexMap<String, usize> = IndexMap::new();
    let mut gains: IndexMap<String, f32> = IndexMap::new();

    for tree in trees {
        for line in tree.as_ref().lines() {
            let Some((feature, statistics)) = split_descriptor(line) else {
                continue;
            };

            let raw = statistics
                .split_once(separator.as_str())
                .map(|(_, value)| value.split(',').next().unwrap_or(value).trim())
                .ok_or_else(|| {
                    XGBoostError::parse(format!("dump line {line:?} has no {statistic} statistic"))
                })?;
            let value = raw.parse::<f32>().map_err(|_| {
                XGBoostError::parse(format!("dump line {line:?} has non-numeric {statistic} {raw:?}"))
            })?;

            *weights.entry(feature.to_string()).or_insert(0) += 1;
            *gains.entry(feature.to_string()).or_insert(0.0) += value;
        }
    }

    if average {
        for (feature, total) in gains.iter_mut() {
            if let Some(&count) = weights.get(feature) {
                *total /= count as f32;
            }
        }
    }

    Ok(FeatureScore {
        weights,
        gains: Some(gains),
    })
}

/// Score features for an importance kind.
///
/// `plain` is the dump without statistics and is used for weight importance,
/// `with_stats` the dump with statistics for every other kind.
pub fn score<S: AsRef<str>>(plain: &[S], with_stats: &[S], importance: ImportanceType) -> Result<FeatureScore> {
    match importance.statistic() {
        None => Ok(FeatureScore {
            weights: weight_importance(plain),
            gains: None,
        }),
        Some((statistic, average)) => stat_importance(with_stats, statistic, average),
    }
}

/// Join per-tree dumps into a single document.
pub fn format_model_dump<S: AsRef<str>>(trees: &[S], format: ModelFormat) -> String {
    match format {
        ModelFormat::Json => {
            let joined = trees.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",\n");
            format!("[\n{joined}]\n")
        }
        ModelFormat::Text => trees
            .iter()
            .enumerate()
            .map(|(index, tree)| format!("booster[{index}]:\n{}", tree.as_ref()))
            .collect(),
        ModelFormat::Dot => trees.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n"),
    }
}

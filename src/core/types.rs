//! Core data types shared by the dataset, booster and training modules.
//!
//! Enumerations here mirror the string vocabularies of the XGBoost C API
//! (field names, dump formats, booster kinds). Each one converts to the exact
//! string the native layer expects and parses back with a descriptive error.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Result, XGBoostError};

/// Row index type accepted by the native slicing call.
pub type RowIndex = i32;

/// Iteration number type for boosting rounds.
pub type IterationIndex = usize;

/// Per-iteration evaluation: dataset name → metric name → formatted value.
///
/// Insertion order follows the order in which the native evaluator reported
/// the datasets and metrics.
pub type Evaluation = IndexMap<String, IndexMap<String, String>>;

/// Aggregated cross-validation series keyed `<dataset>-<metric>-mean` and
/// `<dataset>-<metric>-std`.
pub type CvEvaluation = IndexMap<String, Vec<f32>>;

/// Feature type as written in a feature map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    /// Continuous value, code `q`
    Quantitative,
    /// Binary indicator, code `i`
    Indicator,
}

impl FeatureType {
    /// Single-letter code used by XGBoost feature maps.
    pub fn code(&self) -> &'static str {
        match self {
            FeatureType::Quantitative => "q",
            FeatureType::Indicator => "i",
        }
    }
}

impl Default for FeatureType {
    fn default() -> Self {
        FeatureType::Quantitative
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for FeatureType {
    type Err = XGBoostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "q" => Ok(FeatureType::Quantitative),
            "i" => Ok(FeatureType::Indicator),
            other => Err(XGBoostError::feature(format!(
                "Invalid feature type {other:?}, expected \"q\" or \"i\""
            ))),
        }
    }
}

/// Named feature of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name, unique within a dataset
    pub name: String,
    /// Feature type
    pub feature_type: FeatureType,
}

impl Feature {
    /// Create a feature with an explicit type.
    pub fn new<S: Into<String>>(name: S, feature_type: FeatureType) -> Self {
        Feature {
            name: name.into(),
            feature_type,
        }
    }

    /// Create a quantitative feature.
    pub fn quantitative<S: Into<String>>(name: S) -> Self {
        Self::new(name, FeatureType::Quantitative)
    }

    /// Create an indicator feature.
    pub fn indicator<S: Into<String>>(name: S) -> Self {
        Self::new(name, FeatureType::Indicator)
    }
}

/// Row/column shape of a dense matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub columns: usize,
}

impl Shape {
    /// Create a new shape.
    pub fn new(rows: usize, columns: usize) -> Self {
        Shape { rows, columns }
    }

    /// Number of values in a dense buffer of this shape.
    pub fn len(&self) -> usize {
        self.rows * self.columns
    }

    /// True when the shape holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, columns): (usize, usize)) -> Self {
        Shape { rows, columns }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.columns)
    }
}

/// Booster kinds understood by XGBoost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoosterType {
    /// Tree booster
    GbTree,
    /// Linear booster
    GbLinear,
    /// Dropout tree booster
    Dart,
}

impl BoosterType {
    /// Parameter value for the `booster` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoosterType::GbTree => "gbtree",
            BoosterType::GbLinear => "gblinear",
            BoosterType::Dart => "dart",
        }
    }

    /// Feature importance is only defined for tree based boosters.
    pub fn supports_importance(&self) -> bool {
        matches!(self, BoosterType::GbTree | BoosterType::Dart)
    }
}

impl Default for BoosterType {
    fn default() -> Self {
        BoosterType::GbTree
    }
}

impl fmt::Display for BoosterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BoosterType {
    type Err = XGBoostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gbtree" => Ok(BoosterType::GbTree),
            "gblinear" => Ok(BoosterType::GbLinear),
            "dart" => Ok(BoosterType::Dart),
            other => Err(XGBoostError::invalid_parameter(
                "booster",
                other,
                "expected one of gbtree, gblinear, dart",
            )),
        }
    }
}

/// Feature importance kinds computed from model dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceType {
    /// Number of splits using the feature
    Weight,
    /// Average gain of splits using the feature
    Gain,
    /// Average coverage of splits using the feature
    Cover,
    /// Total gain of splits using the feature
    TotalGain,
    /// Total coverage of splits using the feature
    TotalCover,
}

impl ImportanceType {
    /// Name of the importance kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportanceType::Weight => "weight",
            ImportanceType::Gain => "gain",
            ImportanceType::Cover => "cover",
            ImportanceType::TotalGain => "total_gain",
            ImportanceType::TotalCover => "total_cover",
        }
    }

    /// Statistic key in the dump and whether the sum is averaged per split.
    ///
    /// `None` for [`ImportanceType::Weight`], which only counts splits.
    pub fn statistic(&self) -> Option<(&'static str, bool)> {
        match self {
            ImportanceType::Weight => None,
            ImportanceType::Gain => Some(("gain", true)),
            ImportanceType::Cover => Some(("cover", true)),
            ImportanceType::TotalGain => Some(("gain", false)),
            ImportanceType::TotalCover => Some(("cover", false)),
        }
    }
}

impl Default for ImportanceType {
    fn default() -> Self {
        ImportanceType::Weight
    }
}

impl fmt::Display for ImportanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImportanceType {
    type Err = XGBoostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "weight" => Ok(ImportanceType::Weight),
            "gain" => Ok(ImportanceType::Gain),
            "cover" => Ok(ImportanceType::Cover),
            "total_gain" => Ok(ImportanceType::TotalGain),
            "total_cover" => Ok(ImportanceType::TotalCover),
            other => Err(XGBoostError::invalid_parameter(
                "importance_type",
                other,
                "expected one of weight, gain, cover, total_gain, total_cover",
            )),
        }
    }
}

/// Model dump formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Plain text trees
    Text,
    /// JSON trees
    Json,
    /// Graphviz dot
    Dot,
}

impl ModelFormat {
    /// Format name passed to the dump call.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Text => "text",
            ModelFormat::Json => "json",
            ModelFormat::Dot => "dot",
        }
    }
}

impl Default for ModelFormat {
    fn default() -> Self {
        ModelFormat::Text
    }
}

/// Input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Sparse `label index:value` lines
    Libsvm,
    /// Comma separated values
    Csv,
    /// Native binary buffer written by `save_binary`
    Binary,
}

impl DataFormat {
    /// Value of the `format` URI query entry, `None` for binary buffers.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            DataFormat::Libsvm => Some("libsvm"),
            DataFormat::Csv => Some("csv"),
            DataFormat::Binary => None,
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Libsvm => write!(f, "libsvm"),
            DataFormat::Csv => write!(f, "csv"),
            DataFormat::Binary => write!(f, "binary"),
        }
    }
}

/// Float fields settable on a data matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatField {
    /// Target values
    Label,
    /// Instance weights
    Weight,
    /// Initial margin, one value per row and class
    BaseMargin,
    /// Lower bound for survival labels
    LabelLowerBound,
    /// Upper bound for survival labels
    LabelUpperBound,
}

impl FloatField {
    /// Field name used by the native layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            FloatField::Label => "label",
            FloatField::Weight => "weight",
            FloatField::BaseMargin => "base_margin",
            FloatField::LabelLowerBound => "label_lower_bound",
            FloatField::LabelUpperBound => "label_upper_bound",
        }
    }

    /// Fields that must hold exactly one value per row.
    pub fn requires_row_count(&self) -> bool {
        !matches!(self, FloatField::BaseMargin)
    }
}

impl fmt::Display for FloatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unsigned integer fields of a data matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UIntField {
    /// Group sizes, summing to the row count
    Group,
    /// Group boundaries as prefix sums, read only
    GroupPtr,
}

impl UIntField {
    /// Field name used by the native layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            UIntField::Group => "group",
            UIntField::GroupPtr => "group_ptr",
        }
    }
}

impl fmt::Display for UIntField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision returned by iteration callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackOutput {
    /// Continue with the next round
    Next,
    /// Finish the current round, then stop
    Stop,
}

impl CallbackOutput {
    /// True for [`CallbackOutput::Stop`].
    pub fn is_stop(&self) -> bool {
        matches!(self, CallbackOutput::Stop)
    }
}

impl Default for CallbackOutput {
    fn default() -> Self {
        CallbackOutput::Next
    }
}

/// Version of the loaded XGBoost library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Major version
    pub major: i32,
    /// Minor version
    pub minor: i32,
    /// Patch version
    pub patch: i32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

//! Ordered booster parameter list and its builder.
//!
//! XGBoost takes parameters as name/value strings through a single setter.
//! [`Parameters`] keeps them in the order given, allows repeated names (one
//! `eval_metric` entry per metric) and is applied verbatim to the booster.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;

use crate::config::validation::ParametersValidator;
use crate::core::constants::LEARNING_RATE_PARAMETER;
use crate::core::error::{Result, XGBoostError};
use crate::core::types::BoosterType;

/// Single booster parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name, e.g. `max_depth`
    pub name: String,
    /// Parameter value as passed to the native setter
    pub value: String,
}

impl Parameter {
    /// Create a parameter from any displayable value.
    pub fn new<N: Into<String>, V: Display>(name: N, value: V) -> Self {
        Parameter {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

impl<N: Into<String>, V: Display> From<(N, V)> for Parameter {
    fn from((name, value): (N, V)) -> Self {
        Parameter::new(name, value)
    }
}

/// Ordered list of booster parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default, rename = "parameter")]
    entries: Vec<Parameter>,
}

impl Parameters {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder with typed setters.
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::new()
    }

    /// Append a parameter and return the list.
    pub fn with<N: Into<String>, V: Display>(mut self, name: N, value: V) -> Self {
        self.push(name, value);
        self
    }

    /// Append a parameter, keeping earlier entries with the same name.
    pub fn push<N: Into<String>, V: Display>(&mut self, name: N, value: V) {
        self.entries.push(Parameter::new(name, value));
    }

    /// Replace every entry named `name` with a single entry, appending if absent.
    pub fn set<N: Into<String>, V: Display>(&mut self, name: N, value: V) {
        let parameter = Parameter::new(name, value);
        match self.entries.iter().position(|p| p.name == parameter.name) {
            Some(first) => {
                self.entries[first] = parameter.clone();
                let mut index = 0;
                self.entries.retain(|p| {
                    let keep = index <= first || p.name != parameter.name;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push(parameter),
        }
    }

    /// Value of the last entry named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Values of every entry named `name`, in order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|p| p.name == name)
            .map(|p| p.value.as_str())
            .collect()
    }

    /// Whether any entry is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|p| p.name == name)
    }

    /// Iterate entries in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Booster kind named by the last `booster` entry.
    ///
    /// Unknown values fail immediately instead of surfacing later as a native
    /// error at training time.
    pub fn booster_type(&self) -> Result<Option<BoosterType>> {
        self.get("booster")
            .map(str::parse::<BoosterType>)
            .transpose()
    }

    /// Learning rate from `learning_rate` or its alias `eta`.
    pub fn learning_rate(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|p| p.name == LEARNING_RATE_PARAMETER || p.name == "eta")
            .map(|p| p.value.as_str())
    }

    /// Check known parameters and fail on the first invalid one.
    pub fn validate(&self) -> Result<()> {
        match ParametersValidator::new().validate(self).into_iter().next() {
            Some(error) => Err(XGBoostError::invalid_parameter(
                error.parameter,
                error.value,
                error.message,
            )),
            None => Ok(()),
        }
    }

    /// Load parameters from a `.json` or `.toml` file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| XGBoostError::config(format!("Failed to read parameter file: {}", e)))?;

        let parameters: Parameters = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                XGBoostError::config(format!("Failed to parse JSON parameters: {}", e))
            })?,
            Some("toml") => toml::from_str(&content).map_err(|e| {
                XGBoostError::config(format!("Failed to parse TOML parameters: {}", e))
            })?,
            _ => {
                return Err(XGBoostError::config(
                    "Unsupported parameter file format. Use .json or .toml",
                ))
            }
        };

        parameters.validate()?;
        Ok(parameters)
    }

    /// Save parameters to a `.json` or `.toml` file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            _ => {
                return Err(XGBoostError::config(
                    "Unsupported parameter file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<P: Into<Parameter>> FromIterator<P> for Parameters {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Parameters {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<P: Into<Parameter>> Extend<P> for Parameters {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        self.entries.extend(iter.into_iter().map(Into::into));
    }
}

/// Builder with typed setters for common booster parameters.
#[derive(Debug, Clone, Default)]
pub struct ParametersBuilder {
    parameters: Parameters,
    validation_errors: Vec<String>,
}

impl ParametersBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the booster kind
    pub fn booster(mut self, booster: BoosterType) -> Self {
        self.parameters.set("booster", booster);
        self
    }

    /// Set the learning objective, e.g. `binary:logistic`
    pub fn objective<S: Into<String>>(mut self, objective: S) -> Self {
        let objective: String = objective.into();
        self.parameters.set("objective", objective);
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, rate: f64) -> Self {
        if rate <= 0.0 {
            self.validation_errors
                .push("learning_rate must be positive".to_string());
        }
        self.parameters.set(LEARNING_RATE_PARAMETER, rate);
        self
    }

    /// Alias of [`ParametersBuilder::learning_rate`] using the `eta` name
    pub fn eta(mut self, rate: f64) -> Self {
        if rate <= 0.0 {
            self.validation_errors.push("eta must be positive".to_string());
        }
        self.parameters.set("eta", rate);
        self
    }

    /// Set the maximum tree depth
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.parameters.set("max_depth", depth);
        self
    }

    /// Set the minimum hessian sum in a child
    pub fn min_child_weight(mut self, weight: f64) -> Self {
        if weight < 0.0 {
            self.validation_errors
                .push("min_child_weight must be non-negative".to_string());
        }
        self.parameters.set("min_child_weight", weight);
        self
    }

    /// Set the row subsampling ratio
    pub fn subsample(mut self, ratio: f64) -> Self {
        if ratio <= 0.0 || ratio > 1.0 {
            self.validation_errors
                .push("subsample must be in range (0.0, 1.0]".to_string());
        }
        self.parameters.set("subsample", ratio);
        self
    }

    /// Set the column subsampling ratio per tree
    pub fn colsample_bytree(mut self, ratio: f64) -> Self {
        if ratio <= 0.0 || ratio > 1.0 {
            self.validation_errors
                .push("colsample_bytree must be in range (0.0, 1.0]".to_string());
        }
        self.parameters.set("colsample_bytree", ratio);
        self
    }

    /// Set the random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.parameters.set("seed", seed);
        self
    }

    /// Add an evaluation metric; may be called repeatedly
    pub fn eval_metric<S: Into<String>>(mut self, metric: S) -> Self {
        let metric: String = metric.into();
        self.parameters.push("eval_metric", metric);
        self
    }

    /// Set the number of classes for multiclass objectives
    pub fn num_class(mut self, classes: u32) -> Self {
        if classes == 0 {
            self.validation_errors
                .push("num_class must be at least 1".to_string());
        }
        self.parameters.set("num_class", classes);
        self
    }

    /// Set the number of native threads, 0 lets XGBoost decide
    pub fn nthread(mut self, threads: u32) -> Self {
        self.parameters.set("nthread", threads);
        self
    }

    /// Set the tree construction method, e.g. `hist`
    pub fn tree_method<S: Into<String>>(mut self, method: S) -> Self {
        let method: String = method.into();
        self.parameters.set("tree_method", method);
        self
    }

    /// Set native verbosity (0 silent to 3 debug)
    pub fn verbosity(mut self, level: u32) -> Self {
        if level > 3 {
            self.validation_errors
                .push("verbosity must be in range [0, 3]".to_string());
        }
        self.parameters.set("verbosity", level);
        self
    }

    /// Append an arbitrary parameter
    pub fn param<N: Into<String>, V: Display>(mut self, name: N, value: V) -> Self {
        self.parameters.push(name, value);
        self
    }

    /// Build the parameter list
    pub fn build(self) -> Result<Parameters> {
        if !self.validation_errors.is_empty() {
            return Err(XGBoostError::config(format!(
                "Parameter validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.parameters.validate()?;
        Ok(self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_order_and_repeats_preserved() {
        let params = Parameters::new()
            .with("eval_metric", "rmse")
            .with("max_depth", 2)
            .with("eval_metric", "mae");

        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["eval_metric", "max_depth", "eval_metric"]);
        assert_eq!(params.get_all("eval_metric"), vec!["rmse", "mae"]);
        assert_eq!(params.get("eval_metric"), Some("mae"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut params = Parameters::new()
            .with("eta", 0.3)
            .with("learning_rate", 0.1)
            .with("max_depth", 3)
            .with("learning_rate", 0.2);
        params.set("learning_rate", 0.05);

        assert_eq!(params.get_all("learning_rate"), vec!["0.05"]);
        assert_eq!(params.iter().nth(1).unwrap().name, "learning_rate");
        assert_eq!(params.len(), 3);
        assert_eq!(params.learning_rate(), Some("0.05"));
    }

    #[test]
    fn test_booster_type_fails_fast() {
        let params = Parameters::new().with("booster", "dart");
        assert_eq!(params.booster_type().unwrap(), Some(BoosterType::Dart));

        assert_eq!(Parameters::new().booster_type().unwrap(), None);

        let params = Parameters::new().with("booster", "forest");
        let err = params.booster_type().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_builder() {
        let params = Parameters::builder()
            .booster(BoosterType::GbTree)
            .objective("binary:logistic")
            .eta(1.0)
            .max_depth(2)
            .eval_metric("logloss")
            .eval_metric("auc")
            .seed(0)
            .build()
            .unwrap();

        assert_eq!(params.get("objective"), Some("binary:logistic"));
        assert_eq!(params.get("booster"), Some("gbtree"));
        assert_eq!(params.get_all("eval_metric"), vec!["logloss", "auc"]);
        assert_eq!(params.learning_rate(), Some("1"));
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert!(Parameters::builder().learning_rate(0.0).build().is_err());
        assert!(Parameters::builder().subsample(1.5).build().is_err());
        assert!(Parameters::builder().param("booster", "forest").build().is_err());
    }

    #[test]
    fn test_from_iterator() {
        let params: Parameters = vec![("seed", "0"), ("max_depth", "2")].into_iter().collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("max_depth"), Some("2"));
    }

    #[test]
    fn test_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let params = Parameters::new()
            .with("objective", "reg:squarederror")
            .with("eval_metric", "rmse")
            .with("eval_metric", "mae");

        for file in ["params.json", "params.toml"] {
            let path = temp_dir.path().join(file);
            params.save_to_file(&path).unwrap();
            let loaded = Parameters::load_from_file(&path).unwrap();
            assert_eq!(loaded, params);
        }

        let path = temp_dir.path().join("params.yaml");
        assert!(params.save_to_file(&path).is_err());
    }
}

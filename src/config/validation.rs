//! Local validation of well-known booster parameters.
//!
//! XGBoost itself rejects unknown names when `validate_parameters=1`. This
//! validator catches malformed values of the common parameters before they
//! reach the native layer, where the resulting message is far less direct.
//! Parameters it does not know are passed through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::parameters::{Parameter, Parameters};
use crate::core::types::BoosterType;

/// Validation error structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Parameter name
    pub parameter: String,
    /// Parameter value
    pub value: String,
    /// Error message
    pub message: String,
    /// Valid range or options
    pub valid_range: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parameter '{}' = '{}': {}",
            self.parameter, self.value, self.message
        )?;
        if let Some(ref range) = self.valid_range {
            write!(f, " (valid range: {})", range)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Positive,
    NonNegative,
    UnitInterval,
    NonNegativeInteger,
    PositiveInteger,
    Flag,
    Booster,
}

impl Rule {
    fn for_parameter(name: &str) -> Option<Rule> {
        let rule = match name {
            "eta" | "learning_rate" => Rule::Positive,
            "gamma" | "min_split_loss" | "min_child_weight" | "lambda" | "reg_lambda"
            | "alpha" | "reg_alpha" | "max_delta_step" => Rule::NonNegative,
            "subsample" | "colsample_bytree" | "colsample_bylevel" | "colsample_bynode" => {
                Rule::UnitInterval
            }
            "max_depth" | "nthread" | "seed" | "verbosity" | "max_bin" => Rule::NonNegativeInteger,
            "num_class" | "num_parallel_tree" => Rule::PositiveInteger,
            "validate_parameters" => Rule::Flag,
            "booster" => Rule::Booster,
            _ => return None,
        };
        Some(rule)
    }

    fn check(&self, value: &str) -> Result<(), (&'static str, &'static str)> {
        match self {
            Rule::Positive => match value.parse::<f64>() {
                Ok(v) if v > 0.0 => Ok(()),
                Ok(_) => Err(("must be positive", "(0, inf)")),
                Err(_) => Err(("must be a number", "(0, inf)")),
            },
            Rule::NonNegative => match value.parse::<f64>() {
                Ok(v) if v >= 0.0 => Ok(()),
                Ok(_) => Err(("must be non-negative", "[0, inf)")),
                Err(_) => Err(("must be a number", "[0, inf)")),
            },
            Rule::UnitInterval => match value.parse::<f64>() {
                Ok(v) if v > 0.0 && v <= 1.0 => Ok(()),
                Ok(_) => Err(("must be in range (0.0, 1.0]", "(0, 1]")),
                Err(_) => Err(("must be a number", "(0, 1]")),
            },
            Rule::NonNegativeInteger => match value.parse::<u64>() {
                Ok(_) => Ok(()),
                Err(_) => Err(("must be a non-negative integer", "[0, inf)")),
            },
            Rule::PositiveInteger => match value.parse::<u64>() {
                Ok(v) if v > 0 => Ok(()),
                _ => Err(("must be a positive integer", "[1, inf)")),
            },
            Rule::Flag => match value {
                "0" | "1" | "true" | "false" => Ok(()),
                _ => Err(("must be a flag", "0 or 1")),
            },
            Rule::Booster => value
                .parse::<BoosterType>()
                .map(|_| ())
                .map_err(|_| ("unknown booster type", "gbtree, gblinear, dart")),
        }
    }
}

/// Validator for booster parameters
#[derive(Debug, Clone, Default)]
pub struct ParametersValidator {
    strict_mode: bool,
}

impl ParametersValidator {
    /// Create a validator that passes unknown parameters through
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator that also rejects empty names and values
    pub fn strict() -> Self {
        ParametersValidator { strict_mode: true }
    }

    /// Check a single parameter
    pub fn validate_parameter(&self, parameter: &Parameter) -> Option<ValidationError> {
        if self.strict_mode && (parameter.name.trim().is_empty() || parameter.value.trim().is_empty())
        {
            return Some(ValidationError {
                parameter: parameter.name.clone(),
                value: parameter.value.clone(),
                message: "name and value must not be empty".to_string(),
                valid_range: None,
            });
        }

        let rule = Rule::for_parameter(&parameter.name)?;
        rule.check(parameter.value.trim())
            .err()
            .map(|(message, range)| ValidationError {
                parameter: parameter.name.clone(),
                value: parameter.value.clone(),
                message: message.to_string(),
                valid_range: Some(range.to_string()),
            })
    }

    /// Check every parameter, returning all problems in order
    pub fn validate(&self, parameters: &Parameters) -> Vec<ValidationError> {
        parameters
            .iter()
            .filter_map(|parameter| self.validate_parameter(parameter))
            .collect()
    }
}

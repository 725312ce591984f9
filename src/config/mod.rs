//! Booster configuration.
//!
//! Parameters are kept as an ordered list of name/value strings, validated
//! locally where the value is well known, and loadable from JSON or TOML
//! files.

pub mod parameters;
pub mod validation;

pub use parameters::{Parameter, Parameters, ParametersBuilder};
pub use validation::{ParametersValidator, ValidationError};

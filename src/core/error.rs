//! Error handling and error types for the XGBoost bindings.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors fall into
//! three groups: configuration errors detected locally before any native call,
//! native errors carrying the engine's own last-error message, and missing-data
//! errors raised by callbacks that were asked to track something absent.

use std::io;
use thiserror::Error;

/// Main error type for the XGBoost bindings.
#[derive(Error, Debug)]
pub enum XGBoostError {
    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the failure
        message: String,
    },

    /// Dataset-related errors
    #[error("Dataset error: {message}")]
    Dataset {
        /// Description of the failure
        message: String,
    },

    /// Feature list and feature map errors
    #[error("Feature error: {message}")]
    Feature {
        /// Description of the failure
        message: String,
    },

    /// Training loop errors
    #[error("Training error: {message}")]
    Training {
        /// Description of the failure
        message: String,
    },

    /// Prediction and output reshaping errors
    #[error("Prediction error: {message}")]
    Prediction {
        /// Description of the failure
        message: String,
    },

    /// Evaluation lookups that referenced absent data or metrics
    #[error("Evaluation error: {message}")]
    Evaluation {
        /// Description of the failure
        message: String,
    },

    /// Parsing of native text output (evaluation strings, model dumps)
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the failure
        message: String,
    },

    /// Non-zero status returned by the native library
    #[error("XGBoost error: {message}")]
    Native {
        /// Description of the failure
        message: String,
    },

    /// Native library or one of its required symbols could not be loaded
    #[error("XGBoost library unavailable: {message}")]
    LibraryUnavailable {
        /// Description of the failure
        message: String,
    },

    /// Model serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the failure
        message: String,
    },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Dimension mismatch errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Required dimensions
        expected: String,
        /// Dimensions received
        actual: String,
    },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        /// Underlying error
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        /// Underlying error
        #[from]
        source: serde_json::Error,
    },

    /// TOML deserialization errors
    #[error("TOML error: {source}")]
    Toml {
        /// Underlying error
        #[from]
        source: toml::de::Error,
    },

    /// Array shape errors from ndarray
    #[error("Shape error: {source}")]
    Shape {
        /// Underlying error
        #[from]
        source: ndarray::ShapeError,
    },

    /// Errors raised inside user supplied objective, metric or callback code
    #[error("Callback error: {0:#}")]
    Callback(anyhow::Error),

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

/// Type alias for Results using XGBoostError
pub type Result<T> = std::result::Result<T, XGBoostError>;

/// Utility functions for error handling
impl XGBoostError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        XGBoostError::Config {
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        XGBoostError::Dataset {
            message: message.into(),
        }
    }

    /// Create a feature error
    pub fn feature<S: Into<String>>(message: S) -> Self {
        XGBoostError::Feature {
            message: message.into(),
        }
    }

    /// Create a training error
    pub fn training<S: Into<String>>(message: S) -> Self {
        XGBoostError::Training {
            message: message.into(),
        }
    }

    /// Create a prediction error
    pub fn prediction<S: Into<String>>(message: S) -> Self {
        XGBoostError::Prediction {
            message: message.into(),
        }
    }

    /// Create an evaluation error
    pub fn evaluation<S: Into<String>>(message: S) -> Self {
        XGBoostError::Evaluation {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        XGBoostError::Parse {
            message: message.into(),
        }
    }

    /// Create a native error from the engine's last-error message
    pub fn native<S: Into<String>>(message: S) -> Self {
        XGBoostError::Native {
            message: message.into(),
        }
    }

    /// Create a library unavailable error
    pub fn library_unavailable<S: Into<String>>(message: S) -> Self {
        XGBoostError::LibraryUnavailable {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        XGBoostError::Serialization {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        XGBoostError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        XGBoostError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        XGBoostError::Internal {
            message: message.into(),
        }
    }

    /// True for errors detected locally, before the native layer was reached.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            XGBoostError::Config { .. }
                | XGBoostError::Feature { .. }
                | XGBoostError::InvalidParameter { .. }
                | XGBoostError::DimensionMismatch { .. }
        )
    }

    /// Native failures are terminal; nothing in the crate retries them.
    pub fn is_native(&self) -> bool {
        matches!(
            self,
            XGBoostError::Native { .. } | XGBoostError::LibraryUnavailable { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            XGBoostError::Config { .. } => "config",
            XGBoostError::Dataset { .. } => "dataset",
            XGBoostError::Feature { .. } => "feature",
            XGBoostError::Training { .. } => "training",
            XGBoostError::Prediction { .. } => "prediction",
            XGBoostError::Evaluation { .. } => "evaluation",
            XGBoostError::Parse { .. } => "parse",
            XGBoostError::Native { .. } => "native",
            XGBoostError::LibraryUnavailable { .. } => "library_unavailable",
            XGBoostError::Serialization { .. } => "serialization",
            XGBoostError::InvalidParameter { .. } => "invalid_parameter",
            XGBoostError::DimensionMismatch { .. } => "dimension_mismatch",
            XGBoostError::IO { .. } => "io",
            XGBoostError::Json { .. } => "json",
            XGBoostError::Toml { .. } => "toml",
            XGBoostError::Shape { .. } => "shape",
            XGBoostError::Callback(..) => "callback",
            XGBoostError::Internal { .. } => "internal",
        }
    }
}

impl From<toml::ser::Error> for XGBoostError {
    fn from(err: toml::ser::Error) -> Self {
        XGBoostError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for XGBoostError {
    fn from(err: anyhow::Error) -> Self {
        XGBoostError::Callback(err)
    }
}

impl From<std::ffi::NulError> for XGBoostError {
    fn from(err: std::ffi::NulError) -> Self {
        XGBoostError::Config {
            message: format!("string passed to XGBoost contains an interior NUL byte: {err}"),
        }
    }
}

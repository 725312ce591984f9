//! # xgboost-rust
//!
//! Rust bindings for the XGBoost C API, with a training loop, early stopping
//! and k-fold cross-validation on top.
//!
//! The shared library is loaded at runtime from `XGBOOST_LIB_PATH` or the
//! platform's library search path. Every native handle is owned by exactly
//! one wrapper ([`DMatrix`] or [`Booster`]) and freed when it is dropped.
//!
//! ## Features
//!
//! - **Data**: dense matrices from slices, `ndarray` arrays or nested
//!   vectors, and libsvm/CSV/binary files; labels, weights, margins and
//!   ranking groups; feature names and types.
//! - **Training**: native or custom objectives, custom metrics, callbacks
//!   before and after each round, early stopping and learning rate
//!   schedules, resumable through checkpoints.
//! - **Models**: prediction with margins, leaves, contributions and
//!   interactions; save, load and serialize; text/JSON/dot dumps and
//!   feature importance.
//! - **Cross-validation**: plain and group-preserving folds with mean and
//!   standard deviation per metric.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xgboost_rust::{train, DMatrix, EarlyStopping, Parameters, PredictOptions, Shape, TrainOptions};
//!
//! # fn main() -> xgboost_rust::Result<()> {
//! xgboost_rust::init()?;
//!
//! let values: Vec<f32> = (0..400).map(|v| (v % 17) as f32).collect();
//! let labels: Vec<f32> = (0..100).map(|v| (v % 2) as f32).collect();
//!
//! let training = DMatrix::builder("train")
//!     .dense(&values, Shape::new(100, 4))
//!     .label(&labels)
//!     .build()?;
//! let validation = DMatrix::builder("valid")
//!     .dense(&values, Shape::new(100, 4))
//!     .label(&labels)
//!     .build()?;
//!
//! let parameters = Parameters::builder()
//!     .objective("binary:logistic")
//!     .max_depth(3)
//!     .eval_metric("logloss")
//!     .build()?;
//!
//! let mut options = TrainOptions::new(100)
//!     .evaluation_data(&[&validation])
//!     .early_stopping(EarlyStopping::new("valid", "logloss", 10, false));
//! let (mut booster, summary) = train(&parameters, &training, &mut options)?;
//!
//! let predictions = booster.predict(&validation, &PredictOptions::default())?;
//! println!("{} rounds, predictions {:?}", summary.iterations_run, predictions.shape());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: errors, shared types, the native function table and logging
//! - [`config`]: ordered parameter lists and their validation
//! - [`dataset`]: [`DMatrix`] and its inputs
//! - [`boosting`]: [`Booster`], the training loop and callbacks
//! - [`cross_validation`]: folds and the cross-validation loop

#![doc(html_root_url = "https://docs.rs/xgboost-rust/")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Parameter lists
pub mod config;

// Data matrices
pub mod dataset;

// Boosters and the training loop
pub mod boosting;

// K-fold cross-validation
pub mod cross_validation;

// Re-export core functionality for convenience
pub use core::{
    constants::*,
    error::{Result, XGBoostError},
    logging::{register_log_callback, LogCallback},
    types::*,
    CoreCapabilities,
};

// Re-export configuration functionality
pub use config::{Parameter, Parameters, ParametersBuilder, ParametersValidator, ValidationError};

// Re-export dataset functionality
pub use dataset::{DMatrix, DMatrixBuilder, FileOptions, FloatSource, IndexSource, ShapeSource, UIntSource};

// Re-export boosting functionality
pub use boosting::{
    train, AfterIteration, BeforeIteration, Booster, BoosterOptions, Callback, EarlyStopping,
    EvaluationFunction, FeatureScore, ObjectiveFunction, PredictOptions, TrainOptions,
    TrainSummary, VariableLearningRate,
};

// Re-export cross-validation functionality
pub use cross_validation::{cross_validate, cross_validate_dataset, CvFold, CvOptions, CvResult};

// Version information
pub use core::CORE_MODULE_VERSION as VERSION;

/// Initialize the bindings.
///
/// Installs `env_logger` unless a logger is already set, loads the native
/// library and forwards its log output to the `log` facade. Other functions
/// load the library lazily, so calling this is optional but surfaces a
/// missing library early.
///
/// # Examples
///
/// ```rust,no_run
/// fn main() -> xgboost_rust::Result<()> {
///     xgboost_rust::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    core::initialize_core()
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    core::is_core_initialized()
}

/// What the loaded native library supports.
///
/// # Examples
///
/// ```rust
/// let caps = xgboost_rust::capabilities();
/// println!("{}", caps.summary());
/// ```
pub fn capabilities() -> CoreCapabilities {
    core::core_capabilities()
}

//! Constants shared with the native XGBoost library.
//!
//! Values here are part of the C API contract (prediction bitmask, field
//! and attribute names) or of the model dump text format.

/// Missing value sentinel used when building matrices from dense buffers.
pub const DEFAULT_MISSING_VALUE: f32 = f32::MAX;

/// Prefix of the placeholder feature names generated for unnamed columns.
pub const DEFAULT_FEATURE_PREFIX: &str = "F-";

/// Characters that may not appear in feature names.
/// They delimit split conditions in the text model dump.
pub const RESERVED_FEATURE_CHARS: [char; 3] = ['[', ']', '<'];

/// Metrics that are maximized during early stopping.
pub const MAXIMIZE_METRICS: [&str; 4] = ["auc", "aucpr", "map", "ndcg"];

/// Booster parameter that turns on native validation of parameter names.
pub const VALIDATE_PARAMETERS: &str = "validate_parameters";

/// Booster parameter holding the learning rate.
pub const LEARNING_RATE_PARAMETER: &str = "learning_rate";

/// Booster attribute storing the best early stopping score.
pub const BEST_SCORE_ATTRIBUTE: &str = "best_score";

/// Booster attribute storing the best early stopping iteration.
pub const BEST_ITERATION_ATTRIBUTE: &str = "best_iteration";

/// Booster attribute storing the human readable best evaluation message.
pub const BEST_MESSAGE_ATTRIBUTE: &str = "best_msg";

/// Booster attribute carrying the fold identifier in cross-validation.
pub const CV_PACK_ID_ATTRIBUTE: &str = "cvpack_id";

/// Environment variable with an explicit path to the XGBoost shared library.
pub const LIBRARY_PATH_ENV: &str = "XGBOOST_LIB_PATH";

/// Checkpoint versions advance by this much per completed iteration.
pub const CHECKPOINT_VERSIONS_PER_ITERATION: i32 = 2;

/// Prediction bitmask: output raw margins.
pub const PREDICT_OUTPUT_MARGIN: i32 = 0x01;

/// Prediction bitmask: output leaf indices.
pub const PREDICT_LEAF: i32 = 0x02;

/// Prediction bitmask: output feature contributions.
pub const PREDICT_CONTRIBUTIONS: i32 = 0x04;

/// Prediction bitmask: approximate contributions.
pub const PREDICT_APPROXIMATE_CONTRIBUTIONS: i32 = 0x08;

/// Prediction bitmask: output feature interaction contributions.
pub const PREDICT_INTERACTIONS: i32 = 0x10;

/// Platform file names tried when no explicit library path is configured.
#[cfg(target_os = "macos")]
pub const LIBRARY_NAMES: &[&str] = &["libxgboost.dylib"];

/// Platform file names tried when no explicit library path is configured.
#[cfg(target_os = "windows")]
pub const LIBRARY_NAMES: &[&str] = &["xgboost.dll", "libxgboost.dll"];

/// Platform file names tried when no explicit library path is configured.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const LIBRARY_NAMES: &[&str] = &["libxgboost.so"];

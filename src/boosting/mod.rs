//! Boosters, the training loop and its callbacks.
//!
//! [`Booster`] wraps a native booster. [`train`] drives it round by round,
//! calling the [`Callback`]s around each update; [`EarlyStopping`] and
//! [`VariableLearningRate`] are the built-in callbacks. Evaluation output
//! and model dumps are parsed by the pure functions in [`evaluation`] and
//! [`importance`].

pub mod booster;
pub mod callback;
pub mod early_stopping;
pub mod evaluation;
pub mod importance;
pub mod learning_rate;
pub mod predict;
pub mod train;

pub use booster::{Booster, BoosterOptions};
pub use callback::{AfterIteration, BeforeIteration, Callback, EvaluationFunction, ObjectiveFunction};
pub use early_stopping::{should_maximize, EarlyStopping, EarlyStoppingState};
pub use evaluation::{format_evaluation, metric_value, parse_evaluation, parse_evaluation_with_names};
pub use importance::FeatureScore;
pub use learning_rate::VariableLearningRate;
pub use predict::{prediction_shape, reshape_predictions, PredictOptions};
pub use train::{train, EvaluationHistory, TrainOptions, TrainSummary};

//! Learning rate schedules applied before each boosting round.

use std::fmt;

use crate::boosting::booster::Booster;
use crate::boosting::callback::BeforeIteration;
use crate::core::constants::LEARNING_RATE_PARAMETER;
use crate::core::error::{Result, XGBoostError};
use crate::core::types::{CallbackOutput, IterationIndex};

type ScheduleFn = Box<dyn Fn(IterationIndex, usize) -> f32 + Send>;

enum Schedule {
    Values(Vec<f32>),
    Function { iterations: usize, function: ScheduleFn },
}

/// Sets `learning_rate` before every round from a list or a function.
pub struct VariableLearningRate {
    schedule: Schedule,
}

impl VariableLearningRate {
    /// One learning rate per round.
    pub fn from_values(values: Vec<f32>) -> Self {
        VariableLearningRate {
            schedule: Schedule::Values(values),
        }
    }

    /// Learning rate computed from `(iteration, iterations)`.
    pub fn from_fn<F>(iterations: usize, function: F) -> Self
    where
        F: Fn(IterationIndex, usize) -> f32 + Send + 'static,
    {
        VariableLearningRate {
            schedule: Schedule::Function {
                iterations,
                function: Box::new(function),
            },
        }
    }

    /// Learning rate for a round.
    pub fn learning_rate(&self, iteration: IterationIndex) -> Result<f32> {
        let rate = match &self.schedule {
            Schedule::Values(values) => *values.get(iteration).ok_or_else(|| {
                XGBoostError::config(format!(
                    "Learning rate schedule has {} values, no value for iteration {}",
                    values.len(),
                    iteration
                ))
            })?,
            Schedule::Function { iterations, function } => function(iteration, *iterations),
        };

        if !rate.is_finite() || rate <= 0.0 {
            return Err(XGBoostError::invalid_parameter(
                LEARNING_RATE_PARAMETER,
                rate.to_string(),
                format!("must be positive at iteration {iteration}"),
            ));
        }
        Ok(rate)
    }
}

impl BeforeIteration for VariableLearningRate {
    fn before_iteration(&mut self, booster: &mut Booster, iteration: usize) -> Result<CallbackOutput> {
        let rate = self.learning_rate(iteration)?;
        booster.set_learning_rate(rate)?;
        Ok(CallbackOutput::Next)
    }
}

impl fmt::Debug for VariableLearningRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schedule {
            Schedule::Values(values) => f.debug_tuple("VariableLearningRate").field(values).finish(),
            Schedule::Function { iterations, .. } => f
                .debug_struct("VariableLearningRate")
                .field("iterations", iterations)
                .finish_non_exhaustive(),
        }
    }
}

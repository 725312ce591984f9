//! Training hooks.
//!
//! Custom objectives and metrics are supplied through [`ObjectiveFunction`]
//! and [`EvaluationFunction`]. Per-round hooks implement [`BeforeIteration`]
//! or [`AfterIteration`] and are handed to the training loop as
//! [`Callback`] values, which run in the order given.
//!
//! All four traits are implemented for closures with the matching
//! signature, so a closure with annotated argument types can be passed
//! directly.

use std::fmt;

use crate::boosting::booster::Booster;
use crate::boosting::early_stopping::EarlyStopping;
use crate::boosting::learning_rate::VariableLearningRate;
use crate::core::error::Result;
use crate::core::types::{CallbackOutput, Evaluation};
use crate::dataset::DMatrix;

/// Custom objective returning gradient and hessian per prediction.
pub trait ObjectiveFunction {
    /// Gradient and hessian for raw margin `predictions` on `data`.
    fn gradient(&mut self, predictions: &[f32], data: &DMatrix) -> Result<(Vec<f32>, Vec<f32>)>;
}

impl<F> ObjectiveFunction for F
where
    F: FnMut(&[f32], &DMatrix) -> Result<(Vec<f32>, Vec<f32>)>,
{
    fn gradient(&mut self, predictions: &[f32], data: &DMatrix) -> Result<(Vec<f32>, Vec<f32>)> {
        self(predictions, data)
    }
}

/// Custom metric returning `(metric name, formatted value)`.
pub trait EvaluationFunction {
    /// Evaluate raw margin `predictions` on `data`.
    fn evaluate(&mut self, predictions: &[f32], data: &DMatrix) -> Result<(String, String)>;
}

impl<F> EvaluationFunction for F
where
    F: FnMut(&[f32], &DMatrix) -> Result<(String, String)>,
{
    fn evaluate(&mut self, predictions: &[f32], data: &DMatrix) -> Result<(String, String)> {
        self(predictions, data)
    }
}

/// Hook run before the update of each round.
pub trait BeforeIteration {
    /// Return [`CallbackOutput::Stop`] to make this round the last one.
    fn before_iteration(&mut self, booster: &mut Booster, iteration: usize) -> Result<CallbackOutput>;
}

impl<F> BeforeIteration for F
where
    F: FnMut(&mut Booster, usize) -> Result<CallbackOutput>,
{
    fn before_iteration(&mut self, booster: &mut Booster, iteration: usize) -> Result<CallbackOutput> {
        self(booster, iteration)
    }
}

/// Hook run after the evaluation of each round.
pub trait AfterIteration {
    /// `evaluation` is `None` when training has no evaluation data.
    fn after_iteration(
        &mut self,
        booster: &mut Booster,
        iteration: usize,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput>;
}

impl<F> AfterIteration for F
where
    F: FnMut(&mut Booster, usize, Option<&Evaluation>) -> Result<CallbackOutput>,
{
    fn after_iteration(
        &mut self,
        booster: &mut Booster,
        iteration: usize,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput> {
        self(booster, iteration, evaluation)
    }
}

/// Callback passed to the training loop.
pub enum Callback {
    /// Stop when a metric stops improving
    EarlyStopping(EarlyStopping),
    /// Set the learning rate before each round
    LearningRate(VariableLearningRate),
    /// Custom hook before the update
    Before(Box<dyn BeforeIteration>),
    /// Custom hook after the evaluation
    After(Box<dyn AfterIteration>),
}

impl Callback {
    /// Wrap a custom before-iteration hook.
    pub fn before<C: BeforeIteration + 'static>(callback: C) -> Self {
        Callback::Before(Box::new(callback))
    }

    /// Wrap a custom after-iteration hook.
    pub fn after<C: AfterIteration + 'static>(callback: C) -> Self {
        Callback::After(Box::new(callback))
    }

    /// Run the before-iteration phase. Callbacks of the other phase continue.
    pub fn before_iteration(&mut self, booster: &mut Booster, iteration: usize) -> Result<CallbackOutput> {
        match self {
            Callback::LearningRate(callback) => callback.before_iteration(booster, iteration),
            Callback::Before(callback) => callback.before_iteration(booster, iteration),
            Callback::EarlyStopping(_) | Callback::After(_) => Ok(CallbackOutput::Next),
        }
    }

    /// Run the after-iteration phase. Callbacks of the other phase continue.
    pub fn after_iteration(
        &mut self,
        booster: &mut Booster,
        iteration: usize,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput> {
        match self {
            Callback::EarlyStopping(callback) => callback.after_iteration(booster, iteration, evaluation),
            Callback::After(callback) => callback.after_iteration(booster, iteration, evaluation),
            Callback::LearningRate(_) | Callback::Before(_) => Ok(CallbackOutput::Next),
        }
    }
}

impl From<EarlyStopping> for Callback {
    fn from(callback: EarlyStopping) -> Self {
        Callback::EarlyStopping(callback)
    }
}

impl From<VariableLearningRate> for Callback {
    fn from(callback: VariableLearningRate) -> Self {
        Callback::LearningRate(callback)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::EarlyStopping(callback) => f.debug_tuple("EarlyStopping").field(callback).finish(),
            Callback::LearningRate(callback) => f.debug_tuple("LearningRate").field(callback).finish(),
            Callback::Before(_) => f.write_str("Before(..)"),
            Callback::After(_) => f.write_str("After(..)"),
        }
    }
}

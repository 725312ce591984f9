//! The boosting loop.
//!
//! Each round runs the before-iteration callbacks, one update, the
//! evaluation, the after-iteration callbacks and early stopping, then
//! stores a checkpoint. A stop requested by any callback ends training
//! after the round in which it was requested.

use std::fmt;
use std::ops::Range;

use indexmap::IndexMap;

use crate::boosting::booster::Booster;
use crate::boosting::callback::{Callback, EvaluationFunction, ObjectiveFunction};
use crate::boosting::early_stopping::EarlyStopping;
use crate::config::Parameters;
use crate::core::constants::CHECKPOINT_VERSIONS_PER_ITERATION;
use crate::core::error::{Result, XGBoostError};
use crate::core::types::{CallbackOutput, Evaluation, IterationIndex};
use crate::dataset::DMatrix;

/// Evaluation values per dataset and metric, one entry per round.
pub type EvaluationHistory = IndexMap<String, IndexMap<String, Vec<String>>>;

/// Inputs of a training run besides the training data.
pub struct TrainOptions<'a> {
    /// Last round (exclusive)
    pub iterations: usize,
    /// First round; resumed from the checkpoint when `None`
    pub start_iteration: Option<IterationIndex>,
    /// Matrices evaluated after every round
    pub evaluation_data: Vec<&'a DMatrix>,
    /// Replaces the native objective
    pub objective: Option<Box<dyn ObjectiveFunction + 'a>>,
    /// Extra metric computed on every evaluation matrix
    pub evaluation: Option<Box<dyn EvaluationFunction + 'a>>,
    /// Per-round hooks, run in order
    pub callbacks: Vec<Callback>,
    /// Runs after the other callbacks
    pub early_stopping: Option<EarlyStopping>,
}

impl<'a> TrainOptions<'a> {
    /// Train rounds `0..iterations`, or from the checkpoint on.
    pub fn new(iterations: usize) -> Self {
        TrainOptions {
            iterations,
            start_iteration: None,
            evaluation_data: Vec::new(),
            objective: None,
            evaluation: None,
            callbacks: Vec::new(),
            early_stopping: None,
        }
    }

    /// Start at a fixed round instead of the checkpoint.
    pub fn start_iteration(mut self, iteration: IterationIndex) -> Self {
        self.start_iteration = Some(iteration);
        self
    }

    /// Evaluate these matrices after every round.
    pub fn evaluation_data(mut self, data: &[&'a DMatrix]) -> Self {
        self.evaluation_data = data.to_vec();
        self
    }

    /// Use a custom objective.
    pub fn objective<O: ObjectiveFunction + 'a>(mut self, objective: O) -> Self {
        self.objective = Some(Box::new(objective));
        self
    }

    /// Add a custom metric.
    pub fn evaluation<E: EvaluationFunction + 'a>(mut self, evaluation: E) -> Self {
        self.evaluation = Some(Box::new(evaluation));
        self
    }

    /// Append a callback.
    pub fn callback<C: Into<Callback>>(mut self, callback: C) -> Self {
        self.callbacks.push(callback.into());
        self
    }

    /// Stop when a metric stops improving.
    pub fn early_stopping(mut self, early_stopping: EarlyStopping) -> Self {
        self.early_stopping = Some(early_stopping);
        self
    }

    fn has_early_stopping(&self) -> bool {
        self.early_stopping.is_some()
            || self
                .callbacks
                .iter()
                .any(|callback| matches!(callback, Callback::EarlyStopping(_)))
    }
}

impl fmt::Debug for TrainOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainOptions")
            .field("iterations", &self.iterations)
            .field("start_iteration", &self.start_iteration)
            .field(
                "evaluation_data",
                &self.evaluation_data.iter().map(|data| data.name()).collect::<Vec<_>>(),
            )
            .field("objective", &self.objective.is_some())
            .field("evaluation", &self.evaluation.is_some())
            .field("callbacks", &self.callbacks)
            .field("early_stopping", &self.early_stopping)
            .finish()
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainSummary {
    /// Rounds completed by this run
    pub iterations_run: usize,
    /// A callback asked training to stop
    pub stopped_early: bool,
    /// Evaluation of the last completed round
    pub last_evaluation: Option<Evaluation>,
    /// Best round found by early stopping
    pub best_iteration: Option<IterationIndex>,
    /// Every evaluation of the run
    pub history: EvaluationHistory,
}

impl TrainSummary {
    /// Values of one metric over the run.
    pub fn metric_history(&self, data_name: &str, metric_name: &str) -> Option<&[String]> {
        self.history
            .get(data_name)
            .and_then(|metrics| metrics.get(metric_name))
            .map(Vec::as_slice)
    }

    fn record(&mut self, evaluation: &Evaluation) {
        for (data_name, metrics) in evaluation {
            let entry = self.history.entry(data_name.clone()).or_default();
            for (metric_name, value) in metrics {
                entry.entry(metric_name.clone()).or_default().push(value.clone());
            }
        }
    }
}

impl Booster {
    /// Train on `data`.
    ///
    /// Without an explicit start round, training resumes after the last
    /// checkpointed round.
    pub fn train(&mut self, data: &DMatrix, options: &mut TrainOptions<'_>) -> Result<TrainSummary> {
        if options.has_early_stopping() && options.evaluation_data.is_empty() {
            return Err(XGBoostError::training(
                "Early stopping requires at least one evaluation dataset",
            ));
        }

        let start = match options.start_iteration {
            Some(start) => start,
            None => {
                let version = self.load_checkpoint()?;
                usize::try_from(version / CHECKPOINT_VERSIONS_PER_ITERATION).unwrap_or(0)
            }
        };
        if start > 0 {
            log::info!("Starting training at iteration {}", start);
        }

        let mut rounds = BoosterRounds {
            booster: self,
            data,
            evaluation_data: options.evaluation_data.clone(),
        };
        let mut summary = run_training(
            &mut rounds,
            start..options.iterations,
            options.objective.as_deref_mut(),
            options.evaluation.as_deref_mut(),
            &mut options.callbacks,
            options.early_stopping.as_mut(),
        )?;
        summary.best_iteration = options
            .early_stopping
            .as_ref()
            .or_else(|| {
                options.callbacks.iter().find_map(|callback| match callback {
                    Callback::EarlyStopping(early_stopping) => Some(early_stopping),
                    _ => None,
                })
            })
            .map(EarlyStopping::best_iteration);

        log::debug!(
            "Training finished after {} iterations{}",
            summary.iterations_run,
            if summary.stopped_early { " (stopped early)" } else { "" }
        );
        Ok(summary)
    }
}

/// Create a booster caching the training and evaluation data, then train it.
pub fn train(
    parameters: &Parameters,
    data: &DMatrix,
    options: &mut TrainOptions<'_>,
) -> Result<(Booster, TrainSummary)> {
    let mut cache = Vec::with_capacity(options.evaluation_data.len() + 1);
    cache.push(data);
    cache.extend(options.evaluation_data.iter().copied());

    let mut booster = Booster::with_cache(&cache, parameters)?;
    let summary = booster.train(data, options)?;
    Ok((booster, summary))
}

/// Steps of one boosting round.
pub(crate) trait TrainingRounds {
    /// Boost one round, with the native objective unless one is given.
    fn update(
        &mut self,
        iteration: IterationIndex,
        objective: Option<&mut (dyn ObjectiveFunction + '_)>,
    ) -> Result<()>;

    /// `None` when there is nothing to evaluate.
    fn evaluate(
        &mut self,
        iteration: IterationIndex,
        evaluation: Option<&mut (dyn EvaluationFunction + '_)>,
    ) -> Result<Option<Evaluation>>;

    fn before_iteration(&mut self, callback: &mut Callback, iteration: IterationIndex) -> Result<CallbackOutput>;

    fn after_iteration(
        &mut self,
        callback: &mut Callback,
        iteration: IterationIndex,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput>;

    fn early_stopping(
        &mut self,
        early_stopping: &mut EarlyStopping,
        iteration: IterationIndex,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput>;

    fn save_checkpoint(&mut self) -> Result<()>;
}

/// A booster bound to its training and evaluation data.
pub(crate) struct BoosterRounds<'b, 'd> {
    pub(crate) booster: &'b mut Booster,
    pub(crate) data: &'d DMatrix,
    pub(crate) evaluation_data: Vec<&'d DMatrix>,
}

impl TrainingRounds for BoosterRounds<'_, '_> {
    fn update(
        &mut self,
        iteration: IterationIndex,
        objective: Option<&mut (dyn ObjectiveFunction + '_)>,
    ) -> Result<()> {
        match objective {
            Some(objective) => self.booster.update_with_objective(self.data, objective),
            None => self.booster.update(iteration, self.data),
        }
    }

    fn evaluate(
        &mut self,
        iteration: IterationIndex,
        evaluation: Option<&mut (dyn EvaluationFunction + '_)>,
    ) -> Result<Option<Evaluation>> {
        if self.evaluation_data.is_empty() {
            return Ok(None);
        }
        self.booster
            .evaluate_with(iteration, &self.evaluation_data, evaluation)
            .map(Some)
    }

    fn before_iteration(&mut self, callback: &mut Callback, iteration: IterationIndex) -> Result<CallbackOutput> {
        callback.before_iteration(self.booster, iteration)
    }

    fn after_iteration(
        &mut self,
        callback: &mut Callback,
        iteration: IterationIndex,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput> {
        callback.after_iteration(self.booster, iteration, evaluation)
    }

    fn early_stopping(
        &mut self,
        early_stopping: &mut EarlyStopping,
        iteration: IterationIndex,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput> {
        early_stopping.call(Some(&mut *self.booster), iteration, evaluation)
    }

    fn save_checkpoint(&mut self) -> Result<()> {
        self.booster.save_checkpoint()
    }
}

/// Run `rounds` on `target`.
pub(crate) fn run_training<'f, T>(
    target: &mut T,
    rounds: Range<IterationIndex>,
    mut objective: Option<&mut (dyn ObjectiveFunction + 'f)>,
    mut evaluation: Option<&mut (dyn EvaluationFunction + 'f)>,
    callbacks: &mut [Callback],
    mut early_stopping: Option<&mut EarlyStopping>,
) -> Result<TrainSummary>
where
    T: TrainingRounds + ?Sized,
{
    let mut summary = TrainSummary::default();

    for iteration in rounds {
        let mut stop = false;
        for callback in callbacks.iter_mut() {
            stop |= target.before_iteration(callback, iteration)?.is_stop();
        }

        target.update(iteration, objective.as_deref_mut())?;

        let current = target.evaluate(iteration, evaluation.as_deref_mut())?;
        if let Some(current) = &current {
            summary.record(current);
        }

        for callback in callbacks.iter_mut() {
            stop |= target.after_iteration(callback, iteration, current.as_ref())?.is_stop();
        }
        if let Some(early_stopping) = early_stopping.as_deref_mut() {
            stop |= target.early_stopping(early_stopping, iteration, current.as_ref())?.is_stop();
        }

        target.save_checkpoint()?;
        summary.iterations_run += 1;
        summary.last_evaluation = current;

        if stop {
            summary.stopped_early = true;
            log::debug!("Callback requested stop at iteration {}", iteration);
            break;
        }
    }

    Ok(summary)
}


#[cfg(test)]
mod tests {
    use super::testing::{after_hook, before_hook, ScriptedRounds};
    use super::*;
    use crate::boosting::learning_rate::VariableLearningRate;

    fn evaluation(pairs: &[(&str, &str, &str)]) -> Evaluation {
        let mut evaluation = Evaluation::new();
        for (data, metric, value) in pairs {
            evaluation
                .entry(data.to_string())
                .or_default()
                .insert(metric.to_string(), value.to_string());
        }
        evaluation
    }

    #[test]
    fn test_options_builder() {
        let options = TrainOptions::new(10)
            .start_iteration(2)
            .callback(VariableLearningRate::from_values(vec![0.1; 10]))
            .early_stopping(EarlyStopping::new("test", "rmse", 3, false));

        assert_eq!(options.iterations, 10);
        assert_eq!(options.start_iteration, Some(2));
        assert_eq!(options.callbacks.len(), 1);
        assert!(options.has_early_stopping());
        assert!(options.evaluation_data.is_empty());
    }

    #[test]
    fn test_early_stopping_in_callbacks_is_detected() {
        let options = TrainOptions::new(5).callback(EarlyStopping::new("test", "auc", 2, false));
        assert!(options.early_stopping.is_none());
        assert!(options.has_early_stopping());
        assert!(!TrainOptions::new(5).has_early_stopping());
    }

    #[test]
    fn test_summary_history() {
        let mut summary = TrainSummary::default();
        summary.record(&evaluation(&[("train", "rmse", "0.5"), ("test", "rmse", "0.6")]));
        summary.record(&evaluation(&[("train", "rmse", "0.4"), ("test", "rmse", "0.55")]));

        assert_eq!(summary.metric_history("train", "rmse").unwrap(), ["0.5", "0.4"]);
        assert_eq!(summary.metric_history("test", "rmse").unwrap(), ["0.6", "0.55"]);
        assert!(summary.metric_history("test", "auc").is_none());
        assert_eq!(summary.history.keys().collect::<Vec<_>>(), ["train", "test"]);
    }

    fn events(rounds: &ScriptedRounds) -> Vec<&str> {
        rounds.events.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_round_steps_run_in_order() {
        let mut rounds = ScriptedRounds::with_scores(&[0.5, 0.4]);
        let mut callbacks = vec![before_hook(), after_hook()];
        let mut early_stopping = EarlyStopping::new("test", "score", 5, false);

        let summary = run_training(&mut rounds, 0..2, None, None, &mut callbacks, Some(&mut early_stopping)).unwrap();

        assert_eq!(
            events(&rounds),
            [
                "before 0",
                "update 0",
                "evaluate 0",
                "after 0",
                "early_stopping 0",
                "checkpoint",
                "before 1",
                "update 1",
                "evaluate 1",
                "after 1",
                "early_stopping 1",
                "checkpoint",
            ]
        );
        assert_eq!(summary.iterations_run, 2);
        assert!(!summary.stopped_early);
        assert_eq!(summary.metric_history("test", "score").unwrap(), ["0.5", "0.4"]);
        assert_eq!(early_stopping.best_iteration(), 1);
    }

    #[test]
    fn test_stop_after_finishes_round() {
        let mut rounds = ScriptedRounds {
            stop_after: Some(1),
            ..ScriptedRounds::with_scores(&[0.5])
        };
        let mut callbacks = vec![after_hook()];

        let summary = run_training(&mut rounds, 0..10, None, None, &mut callbacks, None).unwrap();

        assert_eq!(summary.iterations_run, 2);
        assert!(summary.stopped_early);
        assert!(summary.last_evaluation.is_some());
        assert_eq!(events(&rounds).last(), Some(&"checkpoint"));
        assert_eq!(rounds.count("checkpoint"), 2);
    }

    #[test]
    fn test_stop_before_still_updates() {
        let mut rounds = ScriptedRounds {
            stop_before: Some(0),
            ..ScriptedRounds::default()
        };
        let mut callbacks = vec![before_hook(), before_hook()];

        let summary = run_training(&mut rounds, 0..5, None, None, &mut callbacks, None).unwrap();

        assert_eq!(events(&rounds), ["before 0", "before 0", "update 0", "checkpoint"]);
        assert_eq!(summary.iterations_run, 1);
        assert!(summary.stopped_early);
        assert!(summary.last_evaluation.is_none());
    }

    #[test]
    fn test_early_stopping_ends_loop() {
        let mut rounds = ScriptedRounds::with_scores(&[0.5, 0.6, 0.7, 0.8]);
        let mut early_stopping = EarlyStopping::new("test", "score", 2, false);

        let summary = run_training(&mut rounds, 0..10, None, None, &mut [], Some(&mut early_stopping)).unwrap();

        assert_eq!(summary.iterations_run, 3);
        assert!(summary.stopped_early);
        assert_eq!(early_stopping.best_iteration(), 0);
        assert_eq!(rounds.count("checkpoint"), 3);
    }

    #[test]
    fn test_early_stopping_callback_ends_loop() {
        let mut rounds = ScriptedRounds::with_scores(&[0.5, 0.6]);
        let mut callbacks = vec![Callback::from(EarlyStopping::new("test", "score", 1, false))];

        let summary = run_training(&mut rounds, 0..10, None, None, &mut callbacks, None).unwrap();

        assert_eq!(summary.iterations_run, 2);
        assert!(summary.stopped_early);
    }

    #[test]
    fn test_early_stopping_without_evaluation_fails() {
        let mut rounds = ScriptedRounds::default();
        let mut early_stopping = EarlyStopping::new("test", "score", 2, false);

        let err = run_training(&mut rounds, 0..3, None, None, &mut [], Some(&mut early_stopping)).unwrap_err();
        assert_eq!(err.category(), "evaluation");
        assert_eq!(rounds.count("checkpoint"), 0);
    }

    #[test]
    fn test_update_failure_propagates() {
        let mut rounds = ScriptedRounds {
            fail_update: Some(1),
            ..ScriptedRounds::with_scores(&[0.5])
        };

        let err = run_training(&mut rounds, 0..5, None, None, &mut [], None).unwrap_err();
        assert_eq!(err.category(), "training");
        assert_eq!(rounds.count("checkpoint"), 1);
    }

    #[test]
    fn test_objective_and_resumed_rounds() {
        let mut rounds = ScriptedRounds::default();
        let mut objective = |_: &[f32], _: &DMatrix| -> Result<(Vec<f32>, Vec<f32>)> { Ok((Vec::new(), Vec::new())) };

        let objective: &mut dyn ObjectiveFunction = &mut objective;
        let summary = run_training(&mut rounds, 3..5, Some(objective), None, &mut [], None).unwrap();

        assert_eq!(summary.iterations_run, 2);
        assert_eq!(events(&rounds), ["objective 3", "checkpoint", "objective 4", "checkpoint"]);
    }
}

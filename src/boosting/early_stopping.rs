//! Early stopping for the training loop and for cross-validation.
//!
//! The callback tracks one metric of one dataset. A round improves on the
//! best score only when it is strictly better; after `stopping_rounds`
//! rounds without improvement the callback asks the loop to stop.

use serde::{Deserialize, Serialize};

use crate::boosting::booster::Booster;
use crate::boosting::callback::AfterIteration;
use crate::boosting::evaluation::{format_evaluation, metric_value};
use crate::core::constants::{
    BEST_ITERATION_ATTRIBUTE, BEST_MESSAGE_ATTRIBUTE, BEST_SCORE_ATTRIBUTE, MAXIMIZE_METRICS,
};
use crate::core::error::{Result, XGBoostError};
use crate::core::types::{CallbackOutput, CvEvaluation, Evaluation, IterationIndex};

/// Best round seen so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingState {
    /// Larger scores are better
    pub maximize: bool,
    /// Round of the best score
    pub best_iteration: IterationIndex,
    /// Best score
    pub best_score: f32,
    /// Summary of the best round
    pub best_message: String,
}

impl EarlyStoppingState {
    /// Initial state before any round was scored.
    pub fn new(maximize: bool) -> Self {
        EarlyStoppingState {
            maximize,
            best_iteration: 0,
            best_score: if maximize { -f32::MAX } else { f32::MAX },
            best_message: best_message(0, ""),
        }
    }

    fn improves(&self, score: f32) -> bool {
        if self.maximize {
            score > self.best_score
        } else {
            score < self.best_score
        }
    }
}

fn best_message(iteration: IterationIndex, evaluation: &str) -> String {
    format!("Best iteration: {iteration}, best evaluation: {evaluation}.")
}

/// Whether a metric is maximized.
///
/// The metric part is taken after the first hyphen when there is one. AUC,
/// AUC-PR, MAP and NDCG, including their `@N` and `:param` forms, are
/// always maximized.
pub fn should_maximize(maximize: bool, metric_name: &str) -> bool {
    let metric = metric_name
        .splitn(2, '-')
        .filter(|part| !part.is_empty())
        .last()
        .unwrap_or(metric_name);
    let base = metric.split([':', '@']).next().unwrap_or(metric);
    maximize || MAXIMIZE_METRICS.contains(&base)
}

/// Early stopping callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    /// Dataset whose metric is tracked
    pub data_name: String,
    /// Tracked metric
    pub metric_name: String,
    /// Rounds without improvement before stopping
    pub stopping_rounds: usize,
    /// Log new best rounds and the stop
    pub verbose: bool,
    /// Store the best round as booster attributes
    pub save_to_attributes: bool,
    /// Current best
    pub state: EarlyStoppingState,
}

impl EarlyStopping {
    /// Track `metric_name` of `data_name`. `maximize` is forced on for
    /// metrics that are always maximized.
    pub fn new<D, M>(data_name: D, metric_name: M, stopping_rounds: usize, maximize: bool) -> Self
    where
        D: Into<String>,
        M: Into<String>,
    {
        let metric_name = metric_name.into();
        let maximize = should_maximize(maximize, &metric_name);
        EarlyStopping {
            data_name: data_name.into(),
            metric_name,
            stopping_rounds,
            verbose: false,
            save_to_attributes: true,
            state: EarlyStoppingState::new(maximize),
        }
    }

    /// Like [`EarlyStopping::new`], restoring the best round from the
    /// booster's attributes when they are present.
    pub fn from_booster<D, M>(
        data_name: D,
        metric_name: M,
        stopping_rounds: usize,
        maximize: bool,
        booster: &Booster,
    ) -> Result<Self>
    where
        D: Into<String>,
        M: Into<String>,
    {
        let mut callback = Self::new(data_name, metric_name, stopping_rounds, maximize);

        if let Some(value) = booster.attribute(BEST_ITERATION_ATTRIBUTE)? {
            callback.state.best_iteration = value.parse().map_err(|_| {
                XGBoostError::parse(format!("attribute {BEST_ITERATION_ATTRIBUTE} = {value:?} is not an iteration"))
            })?;
        }
        if let Some(value) = booster.attribute(BEST_SCORE_ATTRIBUTE)? {
            callback.state.best_score = value.parse().map_err(|_| {
                XGBoostError::parse(format!("attribute {BEST_SCORE_ATTRIBUTE} = {value:?} is not a score"))
            })?;
        }
        if let Some(value) = booster.attribute(BEST_MESSAGE_ATTRIBUTE)? {
            callback.state.best_message = value;
        }

        Ok(callback)
    }

    /// Log new best rounds and the stop.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Store the best round as booster attributes.
    pub fn save_to_attributes(mut self, save: bool) -> Self {
        self.save_to_attributes = save;
        self
    }

    /// Best round seen so far.
    pub fn best_iteration(&self) -> IterationIndex {
        self.state.best_iteration
    }

    /// Best score seen so far.
    pub fn best_score(&self) -> f32 {
        self.state.best_score
    }

    /// Score one training round.
    pub fn call(
        &mut self,
        booster: Option<&mut Booster>,
        iteration: IterationIndex,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput> {
        let evaluation = evaluation.ok_or_else(|| {
            XGBoostError::evaluation("Evaluation data is required for early stopping")
        })?;
        let score = metric_value(evaluation, &self.data_name, &self.metric_name)?;

        if !self.state.improves(score) {
            return Ok(self.check_patience(iteration));
        }

        self.record(iteration, score, &format_evaluation(evaluation));
        if let Some(booster) = booster.filter(|_| self.save_to_attributes) {
            booster.set_attribute(BEST_SCORE_ATTRIBUTE, &self.state.best_score.to_string())?;
            booster.set_attribute(BEST_ITERATION_ATTRIBUTE, &self.state.best_iteration.to_string())?;
            booster.set_attribute(BEST_MESSAGE_ATTRIBUTE, &self.state.best_message)?;
        }
        Ok(CallbackOutput::Next)
    }

    /// Score one cross-validation round on the aggregated results.
    ///
    /// The series is looked up as `<data>-<metric>-mean`, falling back to
    /// `<data>-test-<metric>-mean` so that the name of the split dataset can
    /// be used directly.
    pub fn call_cv(&mut self, iteration: IterationIndex, results: &CvEvaluation) -> Result<CallbackOutput> {
        let direct = format!("{}-{}-mean", self.data_name, self.metric_name);
        let test = format!("{}-test-{}-mean", self.data_name, self.metric_name);
        let series = results
            .get(&direct)
            .or_else(|| results.get(&test))
            .ok_or_else(|| {
                XGBoostError::evaluation(format!(
                    "Cross-validation results contain neither {direct} nor {test}"
                ))
            })?;
        let score = *series.last().ok_or_else(|| {
            XGBoostError::evaluation(format!("Cross-validation series {direct} is empty"))
        })?;

        if !self.state.improves(score) {
            return Ok(self.check_patience(iteration));
        }

        let summary = results
            .iter()
            .filter_map(|(key, values)| values.last().map(|value| format!("{key}:{value}")))
            .collect::<Vec<_>>()
            .join("\t");
        self.record(iteration, score, &summary);
        Ok(CallbackOutput::Next)
    }

    fn record(&mut self, iteration: IterationIndex, score: f32, evaluation: &str) {
        self.state.best_score = score;
        self.state.best_iteration = iteration;
        self.state.best_message = best_message(iteration, evaluation);
        if self.verbose {
            log::info!("{}", self.state.best_message);
        }
    }

    fn check_patience(&self, iteration: IterationIndex) -> CallbackOutput {
        if iteration.saturating_sub(self.state.best_iteration) >= self.stopping_rounds {
            if self.verbose {
                log::info!("Stopping at iteration {}: {}", iteration, self.state.best_message);
            }
            CallbackOutput::Stop
        } else {
            CallbackOutput::Next
        }
    }
}

impl AfterIteration for EarlyStopping {
    fn after_iteration(
        &mut self,
        booster: &mut Booster,
        iteration: usize,
        evaluation: Option<&Evaluation>,
    ) -> Result<CallbackOutput> {
        self.call(Some(booster), iteration, evaluation)
    }
}

//! K-fold cross-validation.
//!
//! Every round trains each fold's booster for exactly that round on its
//! own train and test pair, then aggregates the fold evaluations into
//! `<dataset>-<metric>-mean` and `-std` series. The run stops when early
//! stopping on the aggregate fires, when every fold asked to stop, or when
//! the after-round hook returns [`CallbackOutput::Stop`].
//!
//! ```no_run
//! use xgboost_rust::{cross_validation, DMatrix, DataFormat, EarlyStopping, FileOptions, Parameters};
//! use xgboost_rust::cross_validation::CvOptions;
//!
//! let data = DMatrix::from_file("data", "train.libsvm", DataFormat::Libsvm, &FileOptions::default())?;
//! let parameters = Parameters::new().with("objective", "binary:logistic");
//! let mut options = CvOptions::new(50).early_stopping(EarlyStopping::new("data-test", "logloss", 5, false));
//! let result = cross_validation::cross_validate_dataset(&data, 5, &parameters, true, 42, &mut options)?;
//! println!("{:?}", result.series("data-test-logloss-mean"));
//! # Ok::<(), xgboost_rust::XGBoostError>(())
//! ```

pub mod aggregate;
pub mod fold;

pub use aggregate::{aggregate, aggregate_with_ddof, AggregatedMetric};
pub use fold::{chunk, groups_to_rows, make_folds, plan_folds, plan_group_folds, CvFold, FoldIndices, GroupFoldIndices};

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::boosting::callback::{Callback, EvaluationFunction, ObjectiveFunction};
use crate::boosting::early_stopping::EarlyStopping;
use crate::boosting::train::{run_training, BoosterRounds, TrainingRounds};
use crate::config::Parameters;
use crate::core::error::{Result, XGBoostError};
use crate::core::types::{CallbackOutput, CvEvaluation, IterationIndex};
use crate::dataset::DMatrix;

/// Hook run after every round with the aggregated results so far and
/// whether the run is about to stop.
pub type AfterCvIteration<'a> = Box<dyn FnMut(IterationIndex, &CvEvaluation, bool) -> Result<CallbackOutput> + 'a>;

/// Creates the callbacks of one fold from its index.
pub type CallbackFactory<'a> = Box<dyn FnMut(usize) -> Result<Vec<Callback>> + 'a>;

/// Cross-validation settings.
pub struct CvOptions<'a> {
    /// Number of rounds
    pub iterations: usize,
    /// Applied to the aggregated series
    pub early_stopping: Option<EarlyStopping>,
    /// Custom objective shared by all folds
    pub objective: Option<Box<dyn ObjectiveFunction + 'a>>,
    /// Custom metric shared by all folds
    pub evaluation: Option<Box<dyn EvaluationFunction + 'a>>,
    /// Per-fold callbacks, created once per fold before the first round
    pub callbacks: Option<CallbackFactory<'a>>,
    /// Runs after every round
    pub after_cv_iteration: Option<AfterCvIteration<'a>>,
    /// Delta degrees of freedom of the standard deviation
    pub ddof: usize,
}

impl<'a> CvOptions<'a> {
    /// Run up to `iterations` rounds.
    pub fn new(iterations: usize) -> Self {
        CvOptions {
            iterations,
            early_stopping: None,
            objective: None,
            evaluation: None,
            callbacks: None,
            after_cv_iteration: None,
            ddof: 0,
        }
    }

    /// Stop when the aggregated metric stops improving.
    pub fn early_stopping(mut self, early_stopping: EarlyStopping) -> Self {
        self.early_stopping = Some(early_stopping);
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

    /// Give every fold its own callbacks.
    pub fn callbacks<F>(mut self, factory: F) -> Self
    where
        F: FnMut(usize) -> Result<Vec<Callback>> + 'a,
    {
        self.callbacks = Some(Box::new(factory));
        self
    }

    /// Run `hook` after every round.
    pub fn after_cv_iteration<F>(mut self, hook: F) -> Self
    where
        F: FnMut(IterationIndex, &CvEvaluation, bool) -> Result<CallbackOutput> + 'a,
    {
        self.after_cv_iteration = Some(Box::new(hook));
        self
    }

    /// Use `ddof` delta degrees of freedom for the standard deviation.
    pub fn ddof(mut self, ddof: usize) -> Self {
        self.ddof = ddof;
        self
    }
}

impl fmt::Debug for CvOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvOptions")
            .field("iterations", &self.iterations)
            .field("early_stopping", &self.early_stopping)
            .field("objective", &self.objective.is_some())
            .field("evaluation", &self.evaluation.is_some())
            .field("callbacks", &self.callbacks.is_some())
            .field("after_cv_iteration", &self.after_cv_iteration.is_some())
            .field("ddof", &self.ddof)
            .finish()
    }
}

/// Outcome of a cross-validation run.
#[derive(Debug)]
pub struct CvResult {
    /// `-mean` and `-std` series per dataset and metric
    pub results: CvEvaluation,
    /// The trained folds
    pub folds: Vec<CvFold>,
    /// Best round when early stopping was configured
    pub best_iteration: Option<IterationIndex>,
}

impl CvResult {
    /// One aggregated series, e.g. `data-test-rmse-mean`.
    pub fn series(&self, key: &str) -> Option<&[f32]> {
        self.results.get(key).map(Vec::as_slice)
    }

    /// Number of rounds kept in the results.
    pub fn rounds(&self) -> usize {
        self.results.values().map(Vec::len).max().unwrap_or(0)
    }
}

/// Train `folds` round by round.
///
/// A failure in any fold aborts the whole run.
pub fn cross_validate(mut folds: Vec<CvFold>, options: &mut CvOptions<'_>) -> Result<CvResult> {
    let (results, best_iteration) = {
        let mut targets: Vec<BoosterRounds<'_, '_>> = folds.iter_mut().map(fold_rounds).collect();
        run_folds(&mut targets, options)?
    };

    Ok(CvResult {
        results,
        folds,
        best_iteration,
    })
}

fn fold_rounds(fold: &mut CvFold) -> BoosterRounds<'_, '_> {
    let CvFold { train, test, booster, .. } = fold;
    let train: &DMatrix = train;
    let test: &DMatrix = test;
    BoosterRounds {
        booster,
        data: train,
        evaluation_data: vec![train, test],
    }
}

fn run_folds<T: TrainingRounds>(
    targets: &mut [T],
    options: &mut CvOptions<'_>,
) -> Result<(CvEvaluation, Option<IterationIndex>)> {
    if targets.is_empty() {
        return Err(XGBoostError::config("Cross-validation requires at least one fold"));
    }

    let mut fold_callbacks: Vec<Vec<Callback>> = match options.callbacks.as_mut() {
        Some(factory) => (0..targets.len()).map(|index| factory(index)).collect::<Result<_>>()?,
        None => targets.iter().map(|_| Vec::new()).collect(),
    };

    let mut results = CvEvaluation::new();
    for iteration in 0..options.iterations {
        let mut stopped = 0;
        let mut evaluations = Vec::with_capacity(targets.len());

        for (index, (target, callbacks)) in targets.iter_mut().zip(fold_callbacks.iter_mut()).enumerate() {
            let summary = run_training(
                target,
                iteration..iteration + 1,
                options.objective.as_deref_mut(),
                options.evaluation.as_deref_mut(),
                callbacks,
                None,
            )?;
            if summary.stopped_early {
                stopped += 1;
            }
            let evaluation = summary
                .last_evaluation
                .ok_or_else(|| XGBoostError::internal(format!("fold {index} produced no evaluation")))?;
            evaluations.push(evaluation);
        }

        for metric in aggregate_with_ddof(&evaluations, options.ddof)? {
            results
                .entry(format!("{}-mean", metric.key))
                .or_default()
                .push(metric.mean);
            results
                .entry(format!("{}-std", metric.key))
                .or_default()
                .push(metric.std);
        }

        let early_stop = match options.early_stopping.as_mut() {
            Some(early_stopping) => early_stopping.call_cv(iteration, &results)?.is_stop(),
            None => false,
        };
        let will_stop = early_stop || stopped == targets.len();

        if let Some(hook) = options.after_cv_iteration.as_mut() {
            if hook(iteration, &results, will_stop)?.is_stop() {
                log::debug!("Cross-validation stopped by hook at iteration {}", iteration);
                break;
            }
        }
        if will_stop {
            log::info!("Cross-validation stopped at iteration {}", iteration);
            break;
        }
    }

    let best_iteration = options.early_stopping.as_ref().map(EarlyStopping::best_iteration);
    if let Some(best) = best_iteration {
        for series in results.values_mut() {
            series.truncate(best + 1);
        }
    }

    Ok((results, best_iteration))
}

/// Split `data` into `k` folds and cross-validate.
///
/// `seed` drives the shuffle, so equal seeds give equal folds.
pub fn cross_validate_dataset(
    data: &DMatrix,
    k: usize,
    parameters: &Parameters,
    shuffle: bool,
    seed: u64,
    options: &mut CvOptions<'_>,
) -> Result<CvResult> {
    let mut rng = StdRng::seed_from_u64(seed);
    let folds = make_folds(data, k, parameters, shuffle, &mut rng)?;
    cross_validate(folds, options)
}

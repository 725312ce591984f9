//! Training loop integration tests: callbacks, early stopping, schedules.

use std::sync::{Arc, Mutex};

use xgboost_rust::*;

mod common;
use common::*;

/// Metric that never improves after the first round.
fn constant_metric(_predictions: &[f32], _data: &DMatrix) -> Result<(String, String)> {
    Ok(("constant".to_string(), "1".to_string()))
}

#[test]
fn test_train_records_history() {
    native_or_skip!();

    let training = binary_matrix("train", 60, 3, 1);
    let validation = binary_matrix("valid", 30, 3, 2);
    let mut options = TrainOptions::new(4).evaluation_data(&[&training, &validation]);
    let (_, summary) = train(&binary_parameters(), &training, &mut options).unwrap();

    assert_eq!(summary.iterations_run, 4);
    assert!(!summary.stopped_early);
    assert!(summary.best_iteration.is_none());
    assert_eq!(summary.metric_history("train", "logloss").unwrap().len(), 4);
    assert_eq!(summary.metric_history("valid", "logloss").unwrap().len(), 4);

    let last = summary.last_evaluation.unwrap();
    assert_eq!(last.keys().collect::<Vec<_>>(), ["train", "valid"]);
}

#[test]
fn test_early_stopping_requires_evaluation_data() {
    native_or_skip!();

    let training = binary_matrix("train", 20, 2, 1);
    let mut options = TrainOptions::new(10).early_stopping(EarlyStopping::new("train", "logloss", 2, false));
    let err = train(&binary_parameters(), &training, &mut options).unwrap_err();
    assert_eq!(err.category(), "training");

    let mut options = TrainOptions::new(10).callback(EarlyStopping::new("train", "logloss", 2, false));
    assert!(train(&binary_parameters(), &training, &mut options).is_err());
}

#[test]
fn test_early_stopping_stops_after_patience() {
    native_or_skip!();

    let training = binary_matrix("train", 40, 2, 3);
    let validation = binary_matrix("valid", 20, 2, 4);
    let mut options = TrainOptions::new(50)
        .evaluation_data(&[&validation])
        .evaluation(constant_metric)
        .early_stopping(EarlyStopping::new("valid", "constant", 3, false));
    let (booster, summary) = train(&binary_parameters(), &training, &mut options).unwrap();

    assert_eq!(summary.iterations_run, 4);
    assert!(summary.stopped_early);
    assert_eq!(summary.best_iteration, Some(0));
    assert_eq!(booster.attribute(BEST_ITERATION_ATTRIBUTE).unwrap().as_deref(), Some("0"));
    assert_eq!(booster.attribute(BEST_SCORE_ATTRIBUTE).unwrap().as_deref(), Some("1"));
}

#[test]
fn test_early_stopping_as_callback() {
    native_or_skip!();

    let training = binary_matrix("train", 40, 2, 3);
    let validation = binary_matrix("valid", 20, 2, 4);
    let mut options = TrainOptions::new(50)
        .evaluation_data(&[&validation])
        .evaluation(constant_metric)
        .callback(EarlyStopping::new("valid", "constant", 2, false).save_to_attributes(false));
    let (booster, summary) = train(&binary_parameters(), &training, &mut options).unwrap();

    assert_eq!(summary.iterations_run, 3);
    assert_eq!(summary.best_iteration, Some(0));
    assert!(booster.attribute(BEST_ITERATION_ATTRIBUTE).unwrap().is_none());
}

#[test]
fn test_after_callback_can_stop() {
    native_or_skip!();

    let training = regression_matrix("train", 30, 2, 5);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);

    let mut options = TrainOptions::new(10)
        .evaluation_data(&[&training])
        .callback(Callback::after(
            move |_: &mut Booster, iteration: usize, evaluation: Option<&Evaluation>| -> Result<CallbackOutput> {
                recorder.lock().unwrap().push(iteration);
                assert!(evaluation.is_some());
                Ok(if iteration == 2 { CallbackOutput::Stop } else { CallbackOutput::Next })
            },
        ));
    let (booster, summary) = train(&regression_parameters(), &training, &mut options).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(summary.iterations_run, 3);
    assert!(summary.stopped_early);
    assert_eq!(booster.dump(None, false, ModelFormat::Text).unwrap().len(), 3);
}

#[test]
fn test_before_callbacks_run_in_order() {
    native_or_skip!();

    let training = regression_matrix("train", 30, 2, 6);
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    let second = Arc::clone(&order);

    let mut options = TrainOptions::new(2)
        .callback(Callback::before(move |_: &mut Booster, iteration: usize| -> Result<CallbackOutput> {
            first.lock().unwrap().push(("first", iteration));
            Ok(CallbackOutput::Next)
        }))
        .callback(Callback::before(move |_: &mut Booster, iteration: usize| -> Result<CallbackOutput> {
            second.lock().unwrap().push(("second", iteration));
            Ok(CallbackOutput::Next)
        }));
    let (_, summary) = train(&regression_parameters(), &training, &mut options).unwrap();

    assert_eq!(summary.iterations_run, 2);
    assert!(summary.last_evaluation.is_none());
    assert_eq!(
        *order.lock().unwrap(),
        vec![("first", 0), ("second", 0), ("first", 1), ("second", 1)]
    );
}

#[test]
fn test_learning_rate_schedule() {
    native_or_skip!();

    let training = regression_matrix("train", 50, 3, 7);

    let mut fixed = TrainOptions::new(5);
    let parameters = regression_parameters().with("learning_rate", 0.3);
    let (mut reference, _) = train(&parameters, &training, &mut fixed).unwrap();

    let mut scheduled = TrainOptions::new(5).callback(VariableLearningRate::from_values(vec![0.3; 5]));
    let (mut same, _) = train(&regression_parameters(), &training, &mut scheduled).unwrap();

    let mut tiny = TrainOptions::new(5).callback(VariableLearningRate::from_fn(5, |_, _| 1e-4));
    let (mut slow, _) = train(&regression_parameters(), &training, &mut tiny).unwrap();

    let expected = reference.predict_flat(&training, &PredictOptions::default()).unwrap();
    assert_eq!(same.predict_flat(&training, &PredictOptions::default()).unwrap(), expected);
    assert_ne!(slow.predict_flat(&training, &PredictOptions::default()).unwrap(), expected);
}

#[test]
fn test_short_schedule_fails() {
    native_or_skip!();

    let training = regression_matrix("train", 20, 2, 8);
    let mut options = TrainOptions::new(5).callback(VariableLearningRate::from_values(vec![0.1; 2]));
    let err = train(&regression_parameters(), &training, &mut options).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_resume_from_start_iteration() {
    native_or_skip!();

    let training = binary_matrix("train", 40, 2, 9);
    let mut booster = Booster::with_cache(&[&training], &binary_parameters()).unwrap();

    let first = booster.train(&training, &mut TrainOptions::new(3).start_iteration(0)).unwrap();
    assert_eq!(first.iterations_run, 3);

    let second = booster.train(&training, &mut TrainOptions::new(6).start_iteration(3)).unwrap();
    assert_eq!(second.iterations_run, 3);
    assert_eq!(booster.dump(None, false, ModelFormat::Text).unwrap().len(), 6);
}

#[test]
fn test_custom_objective_and_metric() {
    native_or_skip!();

    let training = regression_matrix("train", 40, 2, 10);
    let labels = training.label().unwrap();
    let calls = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&calls);

    let mut options = TrainOptions::new(3)
        .evaluation_data(&[&training])
        .objective(move |predictions: &[f32], _: &DMatrix| -> Result<(Vec<f32>, Vec<f32>)> {
            *counter.lock().unwrap() += 1;
            let gradient = predictions.iter().zip(&labels).map(|(p, l)| p - l).collect();
            Ok((gradient, vec![1.0; predictions.len()]))
        })
        .evaluation(|predictions: &[f32], data: &DMatrix| -> Result<(String, String)> {
            let labels = data.label()?;
            let error: f32 = predictions.iter().zip(&labels).map(|(p, l)| (p - l).abs()).sum();
            Ok(("mae-custom".to_string(), (error / labels.len() as f32).to_string()))
        });
    let (_, summary) = train(&regression_parameters(), &training, &mut options).unwrap();

    assert_eq!(*calls.lock().unwrap(), 3);
    let history = summary.metric_history("train", "mae-custom").unwrap();
    assert_eq!(history.len(), 3);
    let first: f32 = history[0].parse().unwrap();
    let last: f32 = history[2].parse().unwrap();
    assert!(last < first);
}

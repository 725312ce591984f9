//! Common test utilities for the XGBoost integration tests.
//!
//! Tests that need the native library start with `native_or_skip!()`, which
//! returns early when `libxgboost` cannot be loaded.

#![allow(dead_code)]

use ndarray::{Array1, Array2};
use rand::prelude::*;
use xgboost_rust::*;

/// Return from the test when the native library is unavailable.
#[macro_export]
macro_rules! native_or_skip {
    () => {
        if !xgboost_rust::core::native::is_available() {
            eprintln!("skipping: XGBoost library not available");
            return;
        }
    };
}

/// Random features in `[-3, 3)`.
pub fn create_features(num_samples: usize, num_features: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((num_samples, num_features), |_| rng.gen_range(-3.0..3.0))
}

/// Binary labels from the sign of an alternating sum of the features.
pub fn create_binary_labels(features: &Array2<f32>) -> Array1<f32> {
    features
        .rows()
        .into_iter()
        .map(|row| {
            let score: f32 = row
                .iter()
                .enumerate()
                .map(|(j, value)| if j % 2 == 0 { *value } else { -*value })
                .sum();
            if score > 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Regression labels as a weighted sum of the features.
pub fn create_regression_labels(features: &Array2<f32>) -> Array1<f32> {
    features
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, value)| value * (j + 1) as f32 * 0.1)
                .sum()
        })
        .collect()
}

/// Labelled binary classification matrix.
pub fn binary_matrix(name: &str, num_samples: usize, num_features: usize, seed: u64) -> DMatrix {
    let features = create_features(num_samples, num_features, seed);
    let labels = create_binary_labels(&features);
    DMatrix::builder(name)
        .source(&features)
        .label(&labels.to_vec())
        .build()
        .unwrap()
}

/// Labelled regression matrix.
pub fn regression_matrix(name: &str, num_samples: usize, num_features: usize, seed: u64) -> DMatrix {
    let features = create_features(num_samples, num_features, seed);
    let labels = create_regression_labels(&features);
    DMatrix::builder(name)
        .source(&features)
        .label(&labels.to_vec())
        .build()
        .unwrap()
}

/// Ranking matrix with `groups` query groups of `group_size` rows each.
pub fn ranking_matrix(name: &str, groups: usize, group_size: usize, num_features: usize) -> DMatrix {
    let rows = groups * group_size;
    let features = create_features(rows, num_features, 7);
    let labels: Vec<f32> = (0..rows).map(|row| (row % 3) as f32).collect();
    let sizes = vec![group_size as u32; groups];
    DMatrix::builder(name)
        .source(&features)
        .label(&labels)
        .group(&sizes)
        .build()
        .unwrap()
}

/// Parameters for a small, fast binary model.
pub fn binary_parameters() -> Parameters {
    Parameters::builder()
        .objective("binary:logistic")
        .max_depth(3)
        .eval_metric("logloss")
        .seed(0)
        .verbosity(0)
        .build()
        .unwrap()
}

/// Parameters for a small regression model.
pub fn regression_parameters() -> Parameters {
    Parameters::builder()
        .objective("reg:squarederror")
        .max_depth(3)
        .eval_metric("rmse")
        .seed(0)
        .verbosity(0)
        .build()
        .unwrap()
}

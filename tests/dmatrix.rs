//! DMatrix integration tests against the native library.

use tempfile::TempDir;
use xgboost_rust::*;

mod common;
use common::*;

#[test]
fn test_counts_and_shape() {
    native_or_skip!();

    let data = DMatrix::from_dense("data", &[1.0; 12], Shape::new(4, 3), DEFAULT_MISSING_VALUE).unwrap();
    assert_eq!(data.row_count().unwrap(), 4);
    assert_eq!(data.column_count().unwrap(), 3);
    assert_eq!(data.shape().unwrap(), Shape::new(4, 3));
    assert_eq!(data.name(), "data");
}

#[test]
fn test_default_feature_names() {
    native_or_skip!();

    let data = DMatrix::from_dense("data", &[0.0; 6], Shape::new(2, 3), DEFAULT_MISSING_VALUE).unwrap();
    let names: Vec<&str> = data.features().unwrap().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["F-0", "F-1", "F-2"]);
    assert!(data.features().unwrap().iter().all(|f| f.feature_type == FeatureType::Quantitative));
}

#[test]
fn test_feature_count_mismatch() {
    native_or_skip!();

    let mut data = DMatrix::from_dense("data", &[0.0; 6], Shape::new(2, 3), DEFAULT_MISSING_VALUE).unwrap();
    let err = data
        .set_features(Some(vec![Feature::quantitative("x"), Feature::quantitative("y")]))
        .unwrap_err();
    assert_eq!(err.category(), "feature");
}

#[test]
fn test_slice_keeps_selected_labels() {
    native_or_skip!();

    let data = DMatrix::builder("data")
        .dense(&[1.0f32, 2.0, 3.0][..], Shape::new(3, 1))
        .label(&[10.0f32, 20.0, 30.0][..])
        .build()
        .unwrap();

    let sliced = data.slice(&[0i32, 2][..], None, false).unwrap();
    assert_eq!(sliced.row_count().unwrap(), 2);
    assert_eq!(sliced.label().unwrap(), vec![10.0, 30.0]);
    assert_eq!(sliced.name(), "data");

    // the source is untouched
    assert_eq!(data.row_count().unwrap(), 3);
    assert_eq!(data.label().unwrap(), vec![10.0, 20.0, 30.0]);
}

#[test]
fn test_slice_range_with_new_name() {
    native_or_skip!();

    let data = regression_matrix("data", 20, 3, 1);
    let sliced = data.slice_range(5..15, Some("middle"), false).unwrap();
    assert_eq!(sliced.row_count().unwrap(), 10);
    assert_eq!(sliced.name(), "middle");
}

#[test]
fn test_slice_with_groups_requires_permission() {
    native_or_skip!();

    let data = ranking_matrix("rank", 4, 5, 3);
    assert!(data.slice(&(0..5usize), None, false).unwrap_err().is_configuration_error());
    assert_eq!(data.slice(&(0..5usize), None, true).unwrap().row_count().unwrap(), 5);
}

#[test]
fn test_float_fields_round_trip() {
    native_or_skip!();

    let data = DMatrix::from_dense("data", &[0.0; 8], Shape::new(4, 2), DEFAULT_MISSING_VALUE).unwrap();
    let values = vec![0.5f32, -1.25, 3.0, 1e-7];

    for field in [FloatField::Label, FloatField::Weight, FloatField::LabelLowerBound, FloatField::LabelUpperBound] {
        data.set_float(field, &values).unwrap();
        assert_eq!(data.get_float(field).unwrap(), values);
    }
}

#[test]
fn test_float_field_length_mismatch() {
    native_or_skip!();

    let data = DMatrix::from_dense("data", &[0.0; 8], Shape::new(4, 2), DEFAULT_MISSING_VALUE).unwrap();
    for field in [FloatField::Label, FloatField::Weight, FloatField::LabelLowerBound, FloatField::LabelUpperBound] {
        let err = data.set_float(field, &vec![1.0f32; 3]).unwrap_err();
        assert!(err.is_configuration_error(), "{field:?}: {err}");
    }
}

#[test]
fn test_group_sum_must_match_rows() {
    native_or_skip!();

    let data = DMatrix::from_dense("data", &[0.0; 10], Shape::new(5, 2), DEFAULT_MISSING_VALUE).unwrap();
    assert!(data.set_uint(UIntField::Group, &vec![2u32, 2]).unwrap_err().is_configuration_error());

    data.set_uint(UIntField::Group, &vec![2u32, 3]).unwrap();
    assert_eq!(data.group_ptr().unwrap(), vec![0, 2, 5]);
}

#[test]
fn test_builder_from_ndarray() {
    native_or_skip!();

    let features = create_features(30, 4, 3);
    let data = DMatrix::builder("arr")
        .source(&features)
        .label(&create_binary_labels(&features).to_vec())
        .weight(&vec![1.0f32; 30])
        .build()
        .unwrap();
    assert_eq!(data.shape().unwrap(), Shape::new(30, 4));
    assert_eq!(data.weight().unwrap().len(), 30);
}

#[test]
fn test_save_binary_and_reload() {
    native_or_skip!();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.buffer");
    let data = regression_matrix("data", 15, 2, 9);
    data.save_binary(&path, true).unwrap();

    let loaded = DMatrix::from_file("loaded", &path, DataFormat::Binary, &FileOptions::default()).unwrap();
    assert_eq!(loaded.shape().unwrap(), Shape::new(15, 2));
    assert_eq!(loaded.label().unwrap(), data.label().unwrap());
}

#[test]
fn test_load_libsvm_file() {
    native_or_skip!();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.libsvm");
    std::fs::write(&path, "1 0:1.5 2:3\n0 1:2\n1 0:0.5 1:1 2:1\n").unwrap();

    let data = DMatrix::from_file("svm", &path, DataFormat::Libsvm, &FileOptions::default()).unwrap();
    assert_eq!(data.row_count().unwrap(), 3);
    assert_eq!(data.label().unwrap(), vec![1.0, 0.0, 1.0]);
}

#[test]
fn test_feature_map_round_trip() {
    native_or_skip!();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("features.fmap");
    let features = vec![Feature::quantitative("x"), Feature::quantitative("y")];

    let mut data = DMatrix::from_dense("data", &[0.0; 4], Shape::new(2, 2), DEFAULT_MISSING_VALUE).unwrap();
    data.set_features(Some(features.clone())).unwrap();
    data.save_feature_map(&path).unwrap();

    let mut other = DMatrix::from_dense("other", &[0.0; 4], Shape::new(2, 2), DEFAULT_MISSING_VALUE).unwrap();
    other.load_feature_map(&path).unwrap();
    assert_eq!(other.features().unwrap(), features.as_slice());
}

//! Data matrices.
//!
//! [`DMatrix`] wraps the native matrix used for training and prediction.
//! Input buffers are accepted through the [`source`] traits, and feature
//! names round-trip through feature map files in [`feature_map`].

pub mod dmatrix;
pub mod feature_map;
pub mod source;

pub use dmatrix::{file_uri, validate_features, DMatrix, DMatrixBuilder, FileOptions};
pub use feature_map::{check_feature_name, format_feature_map, load_feature_map, parse_feature_map, save_feature_map};
pub use source::{FloatSource, IndexSource, ShapeSource, UIntSource};

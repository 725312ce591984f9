//! Prediction options and output reshaping.

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::core::constants::{
    PREDICT_APPROXIMATE_CONTRIBUTIONS, PREDICT_CONTRIBUTIONS, PREDICT_INTERACTIONS, PREDICT_LEAF,
    PREDICT_OUTPUT_MARGIN,
};
use crate::core::error::{Result, XGBoostError};

/// Flags for [`Booster::predict`](crate::boosting::Booster::predict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictOptions {
    /// Output the raw untransformed margin
    pub output_margin: bool,
    /// Number of trees to use, 0 for all
    pub tree_limit: u32,
    /// Output the leaf index of each row in each tree
    pub prediction_leaf: bool,
    /// Output feature contributions (SHAP values)
    pub prediction_contributions: bool,
    /// Approximate the contributions
    pub approximate_contributions: bool,
    /// Output SHAP interaction values
    pub prediction_interactions: bool,
    /// The prediction feeds a training step
    pub training: bool,
    /// Check the data's feature names against the booster's
    pub validate_features: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        PredictOptions {
            output_margin: false,
            tree_limit: 0,
            prediction_leaf: false,
            prediction_contributions: false,
            approximate_contributions: false,
            prediction_interactions: false,
            training: false,
            validate_features: true,
        }
    }
}

impl PredictOptions {
    /// Raw margins.
    pub fn margin() -> Self {
        PredictOptions {
            output_margin: true,
            ..Self::default()
        }
    }

    /// Leaf indices.
    pub fn leaf() -> Self {
        PredictOptions {
            prediction_leaf: true,
            ..Self::default()
        }
    }

    /// Feature contributions.
    pub fn contributions() -> Self {
        PredictOptions {
            prediction_contributions: true,
            ..Self::default()
        }
    }

    /// Pairwise feature interactions.
    pub fn interactions() -> Self {
        PredictOptions {
            prediction_interactions: true,
            ..Self::default()
        }
    }

    /// Limit the number of trees.
    pub fn with_tree_limit(mut self, tree_limit: u32) -> Self {
        self.tree_limit = tree_limit;
        self
    }

    /// Bitmask passed to `XGBoosterPredict`.
    pub fn option_mask(&self) -> i32 {
        let mut mask = 0;
        if self.output_margin {
            mask |= PREDICT_OUTPUT_MARGIN;
        }
        if self.prediction_leaf {
            mask |= PREDICT_LEAF;
        }
        if self.prediction_contributions {
            mask |= PREDICT_CONTRIBUTIONS;
        }
        if self.approximate_contributions {
            mask |= PREDICT_APPROXIMATE_CONTRIBUTIONS;
        }
        if self.prediction_interactions {
            mask |= PREDICT_INTERACTIONS;
        }
        mask
    }
}

/// Shape of a flat prediction buffer of `len` values for `rows` rows of
/// `columns` features.
pub fn prediction_shape(len: usize, rows: usize, columns: usize, options: &PredictOptions) -> Result<Vec<usize>> {
    if len == rows {
        return Ok(vec![rows]);
    }
    if rows == 0 || len % rows != 0 {
        return Err(XGBoostError::prediction(format!(
            "{len} predictions cannot be split into {rows} rows"
        )));
    }

    let chunk = len / rows;
    let width = columns + 1;

    let shape = if options.prediction_interactions {
        let groups = chunk / (width * width);
        if groups == 1 {
            vec![rows, width, width]
        } else {
            vec![rows, groups, width, width]
        }
    } else if options.prediction_contributions {
        let groups = chunk / width;
        if groups == 1 {
            vec![rows, width]
        } else {
            vec![rows, groups, width]
        }
    } else {
        vec![rows, chunk]
    };

    if shape.iter().product::<usize>() != len {
        return Err(XGBoostError::prediction(format!(
            "{len} predictions do not fit shape {shape:?} for {columns} features"
        )));
    }
    Ok(shape)
}

/// Reshape a flat prediction buffer.
pub fn reshape_predictions(
    values: Vec<f32>,
    rows: usize,
    columns: usize,
    options: &PredictOptions,
) -> Result<ArrayD<f32>> {
    let shape = prediction_shape(values.len(), rows, columns, options)?;
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_mask() {
        assert_eq!(PredictOptions::default().option_mask(), 0);
        assert_eq!(PredictOptions::margin().option_mask(), 0x01);
        assert_eq!(PredictOptions::leaf().option_mask(), 0x02);
        assert_eq!(PredictOptions::contributions().option_mask(), 0x04);
        assert_eq!(PredictOptions::interactions().option_mask(), 0x10);

        let all = PredictOptions {
            output_margin: true,
            prediction_leaf: true,
            prediction_contributions: true,
            approximate_contributions: true,
            prediction_interactions: true,
            ..PredictOptions::default()
        };
        assert_eq!(all.option_mask(), 0x1f);
    }

    #[test]
    fn test_plain_predictions() {
        let options = PredictOptions::default();
        assert_eq!(prediction_shape(10, 10, 3, &options).unwrap(), vec![10]);
        assert_eq!(prediction_shape(30, 10, 3, &options).unwrap(), vec![10, 3]);
    }

    #[test]
    fn test_leaf_predictions() {
        assert_eq!(prediction_shape(50, 10, 3, &PredictOptions::leaf()).unwrap(), vec![10, 5]);
    }

    #[test]
    fn test_contribution_shapes() {
        let options = PredictOptions::contributions();
        assert_eq!(prediction_shape(40, 10, 3, &options).unwrap(), vec![10, 4]);
        assert_eq!(prediction_shape(120, 10, 3, &options).unwrap(), vec![10, 3, 4]);
    }

    #[test]
    fn test_interaction_shapes() {
        let options = PredictOptions::interactions();
        assert_eq!(prediction_shape(160, 10, 3, &options).unwrap(), vec![10, 4, 4]);
        assert_eq!(prediction_shape(320, 10, 3, &options).unwrap(), vec![10, 2, 4, 4]);
    }

    #[test]
    fn test_length_not_multiple_of_rows() {
        let err = prediction_shape(11, 10, 3, &PredictOptions::default()).unwrap_err();
        assert_eq!(err.category(), "prediction");
        assert!(prediction_shape(5, 0, 3, &PredictOptions::default()).is_err());
    }

    #[test]
    fn test_contributions_with_wrong_width() {
        assert!(prediction_shape(30, 10, 3, &PredictOptions::contributions()).is_err());
    }

    #[test]
    fn test_reshape() {
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let array = reshape_predictions(values, 3, 3, &PredictOptions::contributions()).unwrap();
        assert_eq!(array.shape(), &[3, 4]);
        assert_eq!(array[[2, 0]], 8.0);
    }
}

//! Numeric inputs accepted by the data matrix constructors and setters.
//!
//! Callers hand over plain slices, vectors, nested rows or `ndarray` arrays.
//! Each source type implements the capabilities it actually has: a flat
//! numeric buffer ([`FloatSource`]), a row/column shape ([`ShapeSource`]),
//! row indices ([`IndexSource`]) or unsigned group sizes ([`UIntSource`]).

use ndarray::{ArrayBase, Data, Dimension, Ix2};
use num_traits::AsPrimitive;
use std::borrow::Cow;
use std::ops::Range;

use crate::core::error::{Result, XGBoostError};
use crate::core::types::{RowIndex, Shape};

/// Source of a contiguous row-major `f32` buffer.
pub trait FloatSource {
    /// Values in row-major order.
    fn float_values(&self) -> Result<Cow<'_, [f32]>>;
}

/// Source with a known row/column shape.
pub trait ShapeSource {
    /// Rows and columns of the data.
    fn data_shape(&self) -> Result<Shape>;
}

/// Source of row indices for slicing.
pub trait IndexSource {
    /// Row indices in the order they should appear in the slice.
    fn row_indices(&self) -> Result<Vec<RowIndex>>;
}

/// Source of unsigned values such as group sizes.
pub trait UIntSource {
    /// Values as `u32`.
    fn uint_values(&self) -> Result<Vec<u32>>;
}

impl FloatSource for [f32] {
    fn float_values(&self) -> Result<Cow<'_, [f32]>> {
        Ok(Cow::Borrowed(self))
    }
}

impl FloatSource for Vec<f32> {
    fn float_values(&self) -> Result<Cow<'_, [f32]>> {
        Ok(Cow::Borrowed(self.as_slice()))
    }
}

macro_rules! impl_float_source_cast {
    ($($t:ty),*) => {$(
        impl FloatSource for [$t] {
            fn float_values(&self) -> Result<Cow<'_, [f32]>> {
                Ok(Cow::Owned(self.iter().map(|v| v.as_()).collect()))
            }
        }

        impl FloatSource for Vec<$t> {
            fn float_values(&self) -> Result<Cow<'_, [f32]>> {
                self.as_slice().float_values()
            }
        }
    )*};
}

impl_float_source_cast!(f64, i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl<A, S, D> FloatSource for ArrayBase<S, D>
where
    A: AsPrimitive<f32>,
    S: Data<Elem = A>,
    D: Dimension,
{
    fn float_values(&self) -> Result<Cow<'_, [f32]>> {
        Ok(Cow::Owned(self.iter().map(|v| v.as_()).collect()))
    }
}

impl<S: Data> ShapeSource for ArrayBase<S, Ix2> {
    fn data_shape(&self) -> Result<Shape> {
        Ok(Shape::new(self.nrows(), self.ncols()))
    }
}

impl<T: AsPrimitive<f32>> FloatSource for Vec<Vec<T>> {
    fn float_values(&self) -> Result<Cow<'_, [f32]>> {
        self.data_shape()?;
        Ok(Cow::Owned(
            self.iter().flatten().map(|v| v.as_()).collect(),
        ))
    }
}

impl<T> ShapeSource for Vec<Vec<T>> {
    fn data_shape(&self) -> Result<Shape> {
        let columns = self.first().map_or(0, Vec::len);
        if let Some((row, values)) = self
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != columns)
        {
            return Err(XGBoostError::dimension_mismatch(
                format!("{columns} columns in every row"),
                format!("{} columns in row {row}", values.len()),
            ));
        }
        Ok(Shape::new(self.len(), columns))
    }
}

fn to_row_index<T: TryInto<RowIndex> + Copy + std::fmt::Display>(value: T) -> Result<RowIndex> {
    value
        .try_into()
        .map_err(|_| XGBoostError::config(format!("row index {value} does not fit the native index type")))
}

macro_rules! impl_index_source {
    ($($t:ty),*) => {$(
        impl IndexSource for [$t] {
            fn row_indices(&self) -> Result<Vec<RowIndex>> {
                self.iter().map(|&v| to_row_index(v)).collect()
            }
        }

        impl IndexSource for Vec<$t> {
            fn row_indices(&self) -> Result<Vec<RowIndex>> {
                self.as_slice().row_indices()
            }
        }

        impl IndexSource for Range<$t> {
            fn row_indices(&self) -> Result<Vec<RowIndex>> {
                self.clone().map(to_row_index).collect()
            }
        }
    )*};
}

impl_index_source!(i32, u32, i64, u64, usize);

macro_rules! impl_uint_source {
    ($($t:ty),*) => {$(
        impl UIntSource for [$t] {
            fn uint_values(&self) -> Result<Vec<u32>> {
                self.iter()
                    .map(|&v| {
                        u32::try_from(v).map_err(|_| {
                            XGBoostError::config(format!("value {v} does not fit an unsigned 32-bit field"))
                        })
                    })
                    .collect()
            }
        }

        impl UIntSource for Vec<$t> {
            fn uint_values(&self) -> Result<Vec<u32>> {
                self.as_slice().uint_values()
            }
        }
    )*};
}

impl_uint_source!(u32, i32, u64, i64, usize);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_f32_slices_are_borrowed() {
        let values = vec![1.0f32, 2.0, 3.0];
        assert!(matches!(values.float_values().unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_numeric_casts() {
        let values = vec![1i32, -2, 3];
        assert_eq!(&*values.float_values().unwrap(), &[1.0, -2.0, 3.0]);

        let values = vec![0.5f64, 1.5];
        assert_eq!(&*values.float_values().unwrap(), &[0.5, 1.5]);
    }

    #[test]
    fn test_array2_is_row_major() {
        let matrix = array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        assert_eq!(matrix.data_shape().unwrap(), Shape::new(3, 2));
        assert_eq!(&*matrix.float_values().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let transposed = matrix.t();
        assert_eq!(transposed.data_shape().unwrap(), Shape::new(2, 3));
        assert_eq!(&*transposed.float_values().unwrap(), &[1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_array2_of_f64() {
        let matrix: Array2<f64> = Array2::from_elem((2, 2), 0.25);
        assert_eq!(&*matrix.float_values().unwrap(), &[0.25; 4]);
    }

    #[test]
    fn test_nested_rows() {
        let rows = vec![vec![1u8, 2], vec![3, 4]];
        assert_eq!(rows.data_shape().unwrap(), Shape::new(2, 2));
        assert_eq!(&*rows.float_values().unwrap(), &[1.0, 2.0, 3.0, 4.0]);

        let ragged = vec![vec![1.0f32, 2.0], vec![3.0]];
        assert!(ragged.data_shape().is_err());
        assert!(ragged.float_values().is_err());
    }

    #[test]
    fn test_index_sources() {
        assert_eq!(vec![0usize, 2].row_indices().unwrap(), vec![0, 2]);
        assert_eq!((1u32..4).row_indices().unwrap(), vec![1, 2, 3]);
        assert!(vec![u64::MAX].row_indices().is_err());
    }

    #[test]
    fn test_uint_sources() {
        assert_eq!(vec![2usize, 3].uint_values().unwrap(), vec![2, 3]);
        assert!(vec![-1i32].uint_values().is_err());
    }
}

//! Owned wrapper around a native XGBoost data matrix.
//!
//! A [`DMatrix`] owns exactly one native handle and releases it when dropped.
//! Row and column counts are always queried from the native layer. Field
//! setters check cardinalities locally so that a caller never sees the
//! engine's indirect message for a mismatched label or group vector.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::ffi::{c_float, c_uint};
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::ptr;

use crate::core::constants::{DEFAULT_FEATURE_PREFIX, DEFAULT_MISSING_VALUE, RESERVED_FEATURE_CHARS};
use crate::core::error::{Result, XGBoostError};
use crate::core::native::{self, c_path, c_string, owned_slice, xgb_call, BstUlong, DMatrixHandle};
use crate::core::types::{DataFormat, Feature, FloatField, Shape, UIntField};
use crate::dataset::feature_map;
use crate::dataset::source::{FloatSource, IndexSource, ShapeSource, UIntSource};

/// Options for loading a matrix from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    /// Use external memory, appending `#<name>.cache` to the URI (libsvm only)
    pub use_cache: bool,
    /// Column holding the label, for CSV input
    pub label_column: Option<usize>,
    /// Suppress native messages while loading
    pub silent: bool,
    /// Additional `key=value` entries appended to the URI query
    pub extra_query: Vec<String>,
}

impl Default for FileOptions {
    fn default() -> Self {
        FileOptions {
            use_cache: false,
            label_column: None,
            silent: true,
            extra_query: Vec::new(),
        }
    }
}

/// Build the URI understood by `XGDMatrixCreateFromFile`.
pub fn file_uri(path: &str, name: &str, format: DataFormat, options: &FileOptions) -> Result<String> {
    let mut query = options.extra_query.clone();
    if let Some(format) = format.query_value() {
        query.push(format!("format={format}"));
    }
    if let Some(column) = options.label_column {
        query.push(format!("label_column={column}"));
    }

    let mut uri = path.to_string();
    if options.use_cache {
        if format != DataFormat::Libsvm {
            return Err(XGBoostError::config(
                "Cache currently only supports libsvm files",
            ));
        }
        uri.push_str(&format!("#{name}.cache"));
    }

    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query.join("&"));
    }
    Ok(uri)
}

/// Check a feature list against a column count.
pub fn validate_features(features: &[Feature], columns: usize) -> Result<()> {
    if features.len() != columns {
        return Err(XGBoostError::feature(format!(
            "Features count {} != data count {}",
            features.len(),
            columns
        )));
    }

    let mut seen = HashSet::with_capacity(features.len());
    for feature in features {
        if !seen.insert(feature.name.as_str()) {
            return Err(XGBoostError::feature(format!(
                "Feature names must be unique, {:?} appears more than once",
                feature.name
            )));
        }
        if feature.name.contains(RESERVED_FEATURE_CHARS) {
            return Err(XGBoostError::feature(format!(
                "Feature name {:?} must not contain [, ] or <",
                feature.name
            )));
        }
        feature_map::check_feature_name(&feature.name)?;
    }
    Ok(())
}

/// Named data matrix backed by a native handle.
pub struct DMatrix {
    handle: DMatrixHandle,
    name: String,
    features: OnceCell<Vec<Feature>>,
}

// SAFETY: the handle is exclusively owned and the native matrix has no
// thread affinity. `DMatrix` is not `Sync`.
unsafe impl Send for DMatrix {}

impl DMatrix {
    /// Take ownership of a handle created by the native layer.
    fn from_handle(name: String, handle: DMatrixHandle) -> Result<Self> {
        if handle.is_null() {
            return Err(XGBoostError::native("XGBoost returned a null DMatrix handle"));
        }
        Ok(DMatrix {
            handle,
            name,
            features: OnceCell::new(),
        })
    }

    /// Start building a matrix.
    pub fn builder<S: Into<String>>(name: S) -> DMatrixBuilder {
        DMatrixBuilder::new(name)
    }

    /// Create a matrix from a flat row-major buffer.
    pub fn from_dense<S: Into<String>>(
        name: S,
        values: &[f32],
        shape: Shape,
        missing: f32,
    ) -> Result<Self> {
        Self::create_dense(name.into(), values, shape, missing, 0)
    }

    fn create_dense(
        name: String,
        values: &[f32],
        shape: Shape,
        missing: f32,
        threads: i32,
    ) -> Result<Self> {
        if values.len() != shape.len() {
            return Err(XGBoostError::dimension_mismatch(
                format!("{} values for shape {}", shape.len(), shape),
                format!("{} values", values.len()),
            ));
        }

        let api = native::api()?;
        let mut handle: DMatrixHandle = ptr::null_mut();
        xgb_call!(
            api,
            XGDMatrixCreateFromMat_omp(
                values.as_ptr(),
                shape.rows as BstUlong,
                shape.columns as BstUlong,
                missing,
                &mut handle,
                threads
            )
        )?;
        log::debug!("Created DMatrix {:?} with shape {}", name, shape);
        Self::from_handle(name, handle)
    }

    /// Create a matrix from any source that knows its values and shape.
    pub fn from_source<N, S>(name: N, source: &S) -> Result<Self>
    where
        N: Into<String>,
        S: FloatSource + ShapeSource + ?Sized,
    {
        let shape = source.data_shape()?;
        let values = source.float_values()?;
        Self::create_dense(name.into(), &values, shape, DEFAULT_MISSING_VALUE, 0)
    }

    /// Load a matrix from a CSV, libsvm or binary file.
    pub fn from_file<N, P>(name: N, path: P, format: DataFormat, options: &FileOptions) -> Result<Self>
    where
        N: Into<String>,
        P: AsRef<Path>,
    {
        let name = name.into();
        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| {
            XGBoostError::config(format!("path {} is not valid UTF-8", path.display()))
        })?;
        let uri = c_string(&file_uri(path_str, &name, format, options)?)?;

        let api = native::api()?;
        let mut handle: DMatrixHandle = ptr::null_mut();
        xgb_call!(
            api,
            XGDMatrixCreateFromFile(uri.as_ptr(), options.silent as i32, &mut handle)
        )?;
        log::debug!("Loaded DMatrix {:?} from {}", name, path.display());
        Self::from_handle(name, handle)
    }

    /// Save the matrix in the native binary format.
    pub fn save_binary<P: AsRef<Path>>(&self, path: P, silent: bool) -> Result<()> {
        let path = c_path(path.as_ref())?;
        xgb_call!(
            native::api()?,
            XGDMatrixSaveBinary(self.handle, path.as_ptr(), silent as i32)
        )
    }

    /// Dataset name used in evaluation output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the dataset.
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub(crate) fn handle(&self) -> DMatrixHandle {
        self.handle
    }

    /// Number of rows.
    pub fn row_count(&self) -> Result<usize> {
        let mut count: BstUlong = 0;
        xgb_call!(native::api()?, XGDMatrixNumRow(self.handle, &mut count))?;
        Ok(count as usize)
    }

    /// Number of columns.
    pub fn column_count(&self) -> Result<usize> {
        let mut count: BstUlong = 0;
        xgb_call!(native::api()?, XGDMatrixNumCol(self.handle, &mut count))?;
        Ok(count as usize)
    }

    /// Rows and columns.
    pub fn shape(&self) -> Result<Shape> {
        Ok(Shape::new(self.row_count()?, self.column_count()?))
    }

    /// New matrix holding only the given rows, in the given order.
    ///
    /// Matrices with row groups can only be sliced with `allow_groups`.
    /// The feature list, if any, is carried over.
    pub fn slice<I: IndexSource + ?Sized>(
        &self,
        indices: &I,
        new_name: Option<&str>,
        allow_groups: bool,
    ) -> Result<DMatrix> {
        if !allow_groups && self.group_ptr()?.len() > 1 {
            return Err(XGBoostError::config(format!(
                "DMatrix {:?} has row groups, slicing requires allow_groups",
                self.name
            )));
        }

        let indices = indices.row_indices()?;
        let api = native::api()?;
        let mut handle: DMatrixHandle = ptr::null_mut();
        xgb_call!(
            api,
            XGDMatrixSliceDMatrixEx(
                self.handle,
                indices.as_ptr(),
                indices.len() as BstUlong,
                &mut handle,
                allow_groups as i32
            )
        )?;

        let name = new_name.map_or_else(|| self.name.clone(), str::to_string);
        let sliced = Self::from_handle(name, handle)?;
        if let Some(features) = self.features.get() {
            let _ = sliced.features.set(features.clone());
        }
        Ok(sliced)
    }

    /// Slice a contiguous range of rows.
    pub fn slice_range(
        &self,
        range: Range<usize>,
        new_name: Option<&str>,
        allow_groups: bool,
    ) -> Result<DMatrix> {
        self.slice(&range, new_name, allow_groups)
    }

    /// Set a float field by its native name, without local checks.
    pub fn set_float_info<S: FloatSource + ?Sized>(&self, field: &str, values: &S) -> Result<()> {
        let values = values.float_values()?;
        let field = c_string(field)?;
        xgb_call!(
            native::api()?,
            XGDMatrixSetFloatInfo(
                self.handle,
                field.as_ptr(),
                values.as_ptr() as *const c_float,
                values.len() as BstUlong
            )
        )
    }

    /// Set an unsigned field by its native name, without local checks.
    pub fn set_uint_info<S: UIntSource + ?Sized>(&self, field: &str, values: &S) -> Result<()> {
        let values = values.uint_values()?;
        let field = c_string(field)?;
        xgb_call!(
            native::api()?,
            XGDMatrixSetUIntInfo(
                self.handle,
                field.as_ptr(),
                values.as_ptr() as *const c_uint,
                values.len() as BstUlong
            )
        )
    }

    /// Read a float field by its native name.
    pub fn get_float_info(&self, field: &str) -> Result<Vec<f32>> {
        let field = c_string(field)?;
        let mut len: BstUlong = 0;
        let mut values: *const c_float = ptr::null();
        xgb_call!(
            native::api()?,
            XGDMatrixGetFloatInfo(self.handle, field.as_ptr(), &mut len, &mut values)
        )?;
        // SAFETY: the library returned `len` values owned by the matrix.
        Ok(unsafe { owned_slice(values, len) })
    }

    /// Read an unsigned field by its native name.
    pub fn get_uint_info(&self, field: &str) -> Result<Vec<u32>> {
        let field = c_string(field)?;
        let mut len: BstUlong = 0;
        let mut values: *const c_uint = ptr::null();
        xgb_call!(
            native::api()?,
            XGDMatrixGetUIntInfo(self.handle, field.as_ptr(), &mut len, &mut values)
        )?;
        // SAFETY: the library returned `len` values owned by the matrix.
        Ok(unsafe { owned_slice(values, len) })
    }

    /// Set a float field. Every field except the base margin needs one
    /// value per row.
    pub fn set_float<S: FloatSource + ?Sized>(&self, field: FloatField, values: &S) -> Result<()> {
        let values = values.float_values()?;
        if field.requires_row_count() {
            let rows = self.row_count()?;
            if values.len() != rows {
                return Err(XGBoostError::dimension_mismatch(
                    format!("{rows} {field} values, one per row"),
                    format!("{} values", values.len()),
                ));
            }
        }
        self.set_float_info(field.as_str(), &*values)
    }

    /// Read a float field.
    pub fn get_float(&self, field: FloatField) -> Result<Vec<f32>> {
        self.get_float_info(field.as_str())
    }

    /// Set an unsigned field. Group sizes must sum to the row count.
    pub fn set_uint<S: UIntSource + ?Sized>(&self, field: UIntField, values: &S) -> Result<()> {
        let values = values.uint_values()?;
        match field {
            UIntField::Group => {
                let total: u64 = values.iter().map(|&v| u64::from(v)).sum();
                let rows = self.row_count()?;
                if total != rows as u64 {
                    return Err(XGBoostError::config(format!(
                        "The sum of groups ({total}) must equal the number of rows ({rows})"
                    )));
                }
            }
            UIntField::GroupPtr => {
                return Err(XGBoostError::config(
                    "group_ptr is derived from group sizes and cannot be set",
                ));
            }
        }
        self.set_uint_info(field.as_str(), &values)
    }

    /// Read an unsigned field.
    pub fn get_uint(&self, field: UIntField) -> Result<Vec<u32>> {
        self.get_uint_info(field.as_str())
    }

    /// Labels.
    pub fn label(&self) -> Result<Vec<f32>> {
        self.get_float(FloatField::Label)
    }

    /// Instance weights.
    pub fn weight(&self) -> Result<Vec<f32>> {
        self.get_float(FloatField::Weight)
    }

    /// Base margin.
    pub fn base_margin(&self) -> Result<Vec<f32>> {
        self.get_float(FloatField::BaseMargin)
    }

    /// Lower label bounds.
    pub fn label_lower_bound(&self) -> Result<Vec<f32>> {
        self.get_float(FloatField::LabelLowerBound)
    }

    /// Upper label bounds.
    pub fn label_upper_bound(&self) -> Result<Vec<f32>> {
        self.get_float(FloatField::LabelUpperBound)
    }

    /// Group boundaries as prefix sums, empty without groups.
    pub fn group_ptr(&self) -> Result<Vec<u32>> {
        self.get_uint(UIntField::GroupPtr)
    }

    /// Replace the feature list. `None` clears it, after which placeholder
    /// names are generated again on request.
    pub fn set_features(&mut self, features: Option<Vec<Feature>>) -> Result<()> {
        let Some(features) = features else {
            self.features = OnceCell::new();
            return Ok(());
        };

        validate_features(&features, self.column_count()?)?;
        self.features = OnceCell::from(features);
        Ok(())
    }

    /// Feature list, generating `F-0 … F-n` quantitative placeholders on
    /// first use when none was set.
    pub fn features(&self) -> Result<&[Feature]> {
        self.features_with_prefix(DEFAULT_FEATURE_PREFIX)
    }

    /// Like [`DMatrix::features`] with a custom placeholder prefix.
    pub fn features_with_prefix(&self, prefix: &str) -> Result<&[Feature]> {
        if self.features.get().is_none() {
            let generated = (0..self.column_count()?)
                .map(|index| Feature::quantitative(format!("{prefix}{index}")))
                .collect();
            let _ = self.features.set(generated);
        }
        self.features
            .get()
            .map(Vec::as_slice)
            .ok_or_else(|| XGBoostError::internal("feature list was not initialized"))
    }

    /// Whether a feature list was set or generated.
    pub fn has_features(&self) -> bool {
        self.features.get().is_some()
    }

    /// Write the feature list to a feature map file.
    pub fn save_feature_map<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        feature_map::save_feature_map(self.features()?, path)
    }

    /// Replace the feature list from a feature map file.
    pub fn load_feature_map<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let features = feature_map::load_feature_map(path)?;
        self.set_features(Some(features))
    }
}

impl fmt::Debug for DMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DMatrix")
            .field("name", &self.name)
            .field("features", &self.features.get().map(Vec::len))
            .finish()
    }
}

impl Drop for DMatrix {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        match native::api() {
            Ok(api) => {
                if let Err(err) = xgb_call!(api, XGDMatrixFree(self.handle)) {
                    log::error!("Failed to free DMatrix {:?}: {}", self.name, err);
                }
            }
            Err(err) => log::error!("Failed to free DMatrix {:?}: {}", self.name, err),
        }
        self.handle = ptr::null_mut();
    }
}

/// Builder for dense matrices with optional fields.
#[derive(Debug, Clone)]
pub struct DMatrixBuilder {
    name: String,
    values: Option<(Vec<f32>, Shape)>,
    missing: f32,
    threads: i32,
    features: Option<Vec<Feature>>,
    label: Option<Vec<f32>>,
    weight: Option<Vec<f32>>,
    base_margin: Option<Vec<f32>>,
    label_lower_bound: Option<Vec<f32>>,
    label_upper_bound: Option<Vec<f32>>,
    group: Option<Vec<u32>>,
    validation_errors: Vec<String>,
}

impl DMatrixBuilder {
    /// Create a builder for a named matrix.
    pub fn new<S: Into<String>>(name: S) -> Self {
        DMatrixBuilder {
            name: name.into(),
            values: None,
            missing: DEFAULT_MISSING_VALUE,
            threads: 0,
            features: None,
            label: None,
            weight: None,
            base_margin: None,
            label_lower_bound: None,
            label_upper_bound: None,
            group: None,
            validation_errors: Vec::new(),
        }
    }

    fn collect_floats<S: FloatSource + ?Sized>(&mut self, what: &str, values: &S) -> Option<Vec<f32>> {
        match values.float_values() {
            Ok(values) => Some(values.into_owned()),
            Err(err) => {
                self.validation_errors.push(format!("{what}: {err}"));
                None
            }
        }
    }

    /// Flat row-major values with an explicit shape.
    pub fn dense<S: FloatSource + ?Sized>(mut self, values: &S, shape: Shape) -> Self {
        self.values = self.collect_floats("data", values).map(|values| (values, shape));
        self
    }

    /// Values and shape taken from one source, such as an `Array2`.
    pub fn source<S: FloatSource + ShapeSource + ?Sized>(mut self, source: &S) -> Self {
        match source.data_shape() {
            Ok(shape) => self.dense(source, shape),
            Err(err) => {
                self.validation_errors.push(format!("data: {err}"));
                self
            }
        }
    }

    /// Value treated as missing.
    pub fn missing(mut self, missing: f32) -> Self {
        self.missing = missing;
        self
    }

    /// Loader threads, 0 for all cores.
    pub fn threads(mut self, threads: i32) -> Self {
        self.threads = threads;
        self
    }

    /// Feature names and types.
    pub fn features(mut self, features: Vec<Feature>) -> Self {
        self.features = Some(features);
        self
    }

    /// Labels.
    pub fn label<S: FloatSource + ?Sized>(mut self, values: &S) -> Self {
        self.label = self.collect_floats("label", values);
        self
    }

    /// Instance weights.
    pub fn weight<S: FloatSource + ?Sized>(mut self, values: &S) -> Self {
        self.weight = self.collect_floats("weight", values);
        self
    }

    /// Base margin.
    pub fn base_margin<S: FloatSource + ?Sized>(mut self, values: &S) -> Self {
        self.base_margin = self.collect_floats("base_margin", values);
        self
    }

    /// Lower label bounds.
    pub fn label_lower_bound<S: FloatSource + ?Sized>(mut self, values: &S) -> Self {
        self.label_lower_bound = self.collect_floats("label_lower_bound", values);
        self
    }

    /// Upper label bounds.
    pub fn label_upper_bound<S: FloatSource + ?Sized>(mut self, values: &S) -> Self {
        self.label_upper_bound = self.collect_floats("label_upper_bound", values);
        self
    }

    /// Group sizes.
    pub fn group<S: UIntSource + ?Sized>(mut self, values: &S) -> Self {
        match values.uint_values() {
            Ok(values) => self.group = Some(values),
            Err(err) => self.validation_errors.push(format!("group: {err}")),
        }
        self
    }

    /// Create the native matrix and apply every field.
    pub fn build(self) -> Result<DMatrix> {
        if !self.validation_errors.is_empty() {
            return Err(XGBoostError::config(format!(
                "DMatrix validation failed: {}",
                self.validation_errors.join("; ")
            )));
        }

        let (values, shape) = self
            .values
            .ok_or_else(|| XGBoostError::dataset("DMatrix data is required"))?;
        let mut matrix = DMatrix::create_dense(self.name, &values, shape, self.missing, self.threads)?;

        if let Some(features) = self.features {
            matrix.set_features(Some(features))?;
        }

        let fields = [
            (FloatField::Label, self.label),
            (FloatField::Weight, self.weight),
            (FloatField::BaseMargin, self.base_margin),
            (FloatField::LabelLowerBound, self.label_lower_bound),
            (FloatField::LabelUpperBound, self.label_upper_bound),
        ];
        for (field, values) in fields {
            if let Some(values) = values {
                matrix.set_float(field, &values)?;
            }
        }

        if let Some(group) = self.group {
            matrix.set_uint(UIntField::Group, &group)?;
        }

        Ok(matrix)
    }
}

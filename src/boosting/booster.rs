//! Owned handle to a native booster.
//!
//! A [`Booster`] remembers the feature list of the first matrix it sees and
//! checks every later matrix against it, so that a model is never trained
//! or evaluated on columns it was not built for.

use std::ffi::{c_char, c_float, c_int, c_void, CString};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::ptr;

use indexmap::{IndexMap, IndexSet};
use ndarray::ArrayD;

use crate::boosting::callback::{EvaluationFunction, ObjectiveFunction};
use crate::boosting::evaluation::parse_evaluation_with_names;
use crate::boosting::importance::{self, format_model_dump, FeatureScore};
use crate::boosting::predict::{reshape_predictions, PredictOptions};
use crate::config::Parameters;
use crate::core::constants::{LEARNING_RATE_PARAMETER, VALIDATE_PARAMETERS};
use crate::core::error::{Result, XGBoostError};
use crate::core::native::{
    self, c_path, c_string, owned_slice, owned_string, owned_strings, xgb_call, BoosterHandle,
    BstUlong, DMatrixHandle,
};
use crate::core::types::{BoosterType, Evaluation, Feature, ImportanceType, IterationIndex, ModelFormat, Shape};
use crate::dataset::DMatrix;

/// How a booster is initialized.
///
/// Steps run in field order: the model file is loaded, then the JSON
/// configuration, then `validate_parameters` is switched on and the
/// parameters are applied in insertion order.
#[derive(Debug, Clone)]
pub struct BoosterOptions {
    /// Model file to load
    pub model_path: Option<PathBuf>,
    /// JSON configuration to load
    pub json_config: Option<String>,
    /// Parameters applied after loading
    pub parameters: Parameters,
    /// Ask XGBoost to warn about unknown parameters
    pub validate_parameters: bool,
}

impl Default for BoosterOptions {
    fn default() -> Self {
        BoosterOptions {
            model_path: None,
            json_config: None,
            parameters: Parameters::new(),
            validate_parameters: true,
        }
    }
}

impl BoosterOptions {
    /// Options applying `parameters` to a fresh booster.
    pub fn new(parameters: Parameters) -> Self {
        BoosterOptions {
            parameters,
            ..Self::default()
        }
    }

    /// Load a model file first.
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Load a JSON configuration after the model.
    pub fn json_config<S: Into<String>>(mut self, config: S) -> Self {
        self.json_config = Some(config.into());
        self
    }

    /// Toggle `validate_parameters`.
    pub fn validate_parameters(mut self, validate: bool) -> Self {
        self.validate_parameters = validate;
        self
    }
}

/// Gradient boosted model.
pub struct Booster {
    handle: BoosterHandle,
    features: Option<Vec<Feature>>,
    booster_type: Option<BoosterType>,
}

// SAFETY: the handle is exclusively owned; XGBoost boosters may move between
// threads as long as calls are not concurrent. `Booster` is not `Sync`.
unsafe impl Send for Booster {}

impl Booster {
    /// Create a booster caching `cache` and initialize it from `options`.
    pub fn new(cache: &[&DMatrix], options: &BoosterOptions) -> Result<Self> {
        let api = native::api()?;
        let handles: Vec<DMatrixHandle> = cache.iter().map(|data| data.handle()).collect();
        let mut handle: BoosterHandle = ptr::null_mut();
        xgb_call!(
            api,
            XGBoosterCreate(handles.as_ptr(), handles.len() as BstUlong, &mut handle)
        )?;
        if handle.is_null() {
            return Err(XGBoostError::native("XGBoost returned a null booster handle"));
        }

        let mut booster = Booster {
            handle,
            features: None,
            booster_type: None,
        };

        if let Some(path) = &options.model_path {
            booster.load_model(path)?;
        }
        if let Some(config) = &options.json_config {
            booster.load_config(config)?;
        }
        if options.validate_parameters {
            booster.set_param(VALIDATE_PARAMETERS, 1)?;
        }
        booster.set_parameters(&options.parameters)?;

        for data in cache {
            booster.validate(data)?;
        }

        log::debug!(
            "Created booster with {} cached matrices and {} parameters",
            cache.len(),
            options.parameters.len()
        );
        Ok(booster)
    }

    /// Booster caching `cache` with `parameters` applied.
    pub fn with_cache(cache: &[&DMatrix], parameters: &Parameters) -> Result<Self> {
        Self::new(cache, &BoosterOptions::new(parameters.clone()))
    }

    /// Booster without cached data or parameters.
    pub fn empty() -> Result<Self> {
        Self::new(&[], &BoosterOptions::default())
    }

    /// Load a model saved with [`Booster::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(&[], &BoosterOptions::default().model_path(path.as_ref()))
    }

    /// Restore a booster from [`Booster::serialize`] output.
    pub fn from_buffer(buffer: &[u8]) -> Result<Self> {
        let booster = Self::empty()?;
        xgb_call!(
            native::api()?,
            XGBoosterUnserializeFromBuffer(
                booster.handle,
                buffer.as_ptr() as *const c_void,
                buffer.len() as BstUlong
            )
        )?;
        Ok(booster)
    }

    /// Booster kind when known from a `booster` parameter.
    pub fn booster_type(&self) -> Option<BoosterType> {
        self.booster_type
    }

    /// Features recorded from the first validated matrix.
    pub fn features(&self) -> Option<&[Feature]> {
        self.features.as_deref()
    }

    /// Replace the recorded features.
    pub fn set_features(&mut self, features: Option<Vec<Feature>>) {
        self.features = features;
    }

    /// Set a native parameter.
    ///
    /// A `booster` value is checked locally before it reaches the library.
    pub fn set_param<V: Display>(&mut self, name: &str, value: V) -> Result<()> {
        let value = value.to_string();
        let booster_type = if name == "booster" {
            Some(value.parse::<BoosterType>()?)
        } else {
            None
        };

        let c_name = c_string(name)?;
        let c_value = c_string(&value)?;
        xgb_call!(
            native::api()?,
            XGBoosterSetParam(self.handle, c_name.as_ptr(), c_value.as_ptr())
        )?;

        if booster_type.is_some() {
            self.booster_type = booster_type;
        }
        log::trace!("Set parameter {}={}", name, value);
        Ok(())
    }

    /// Apply parameters in insertion order.
    pub fn set_parameters(&mut self, parameters: &Parameters) -> Result<()> {
        for parameter in parameters.iter() {
            self.set_param(&parameter.name, &parameter.value)?;
        }
        Ok(())
    }

    /// Set `learning_rate`.
    pub fn set_learning_rate(&mut self, rate: f32) -> Result<()> {
        self.set_param(LEARNING_RATE_PARAMETER, rate)
    }

    /// Read an attribute, `None` when it is not set.
    pub fn attribute(&self, name: &str) -> Result<Option<String>> {
        let c_name = c_string(name)?;
        let mut value: *const c_char = ptr::null();
        let mut success: c_int = 0;
        xgb_call!(
            native::api()?,
            XGBoosterGetAttr(self.handle, c_name.as_ptr(), &mut value, &mut success)
        )?;
        if success == 0 {
            return Ok(None);
        }
        // SAFETY: on success the value is a NUL terminated string owned by the booster.
        Ok(Some(unsafe { owned_string(value) }?))
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        let c_name = c_string(name)?;
        let c_value = c_string(value)?;
        xgb_call!(
            native::api()?,
            XGBoosterSetAttr(self.handle, c_name.as_ptr(), c_value.as_ptr())
        )
    }

    /// Every attribute, in the order the library lists them.
    pub fn attributes(&self) -> Result<IndexMap<String, String>> {
        let mut len: BstUlong = 0;
        let mut names: *mut *const c_char = ptr::null_mut();
        xgb_call!(
            native::api()?,
            XGBoosterGetAttrNames(self.handle, &mut len, &mut names)
        )?;
        // SAFETY: the library returned `len` strings.
        let names = unsafe { owned_strings(names, len) }?;

        let mut attributes = IndexMap::with_capacity(names.len());
        for name in names {
            if let Some(value) = self.attribute(&name)? {
                attributes.insert(name, value);
            }
        }
        Ok(attributes)
    }

    /// Current configuration as JSON.
    pub fn config(&self) -> Result<String> {
        let mut len: BstUlong = 0;
        let mut out: *const c_char = ptr::null();
        xgb_call!(
            native::api()?,
            XGBoosterSaveJsonConfig(self.handle, &mut len, &mut out)
        )?;
        // SAFETY: the configuration is a NUL terminated string owned by the booster.
        unsafe { owned_string(out) }
    }

    /// Load a JSON configuration.
    pub fn load_config(&mut self, config: &str) -> Result<()> {
        let config = c_string(config)?;
        xgb_call!(
            native::api()?,
            XGBoosterLoadJsonConfig(self.handle, config.as_ptr())
        )
    }

    /// Load a model file into this booster.
    pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let c_path = c_path(path)?;
        xgb_call!(
            native::api()?,
            XGBoosterLoadModel(self.handle, c_path.as_ptr())
        )?;
        log::debug!("Loaded model from {}", path.display());
        Ok(())
    }

    /// Load a model from memory.
    pub fn load_model_buffer(&mut self, buffer: &[u8]) -> Result<()> {
        xgb_call!(
            native::api()?,
            XGBoosterLoadModelFromBuffer(
                self.handle,
                buffer.as_ptr() as *const c_void,
                buffer.len() as BstUlong
            )
        )
    }

    /// Save the model; the format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let c_path = c_path(path)?;
        xgb_call!(
            native::api()?,
            XGBoosterSaveModel(self.handle, c_path.as_ptr())
        )?;
        log::debug!("Saved model to {}", path.display());
        Ok(())
    }

    /// Model and configuration as bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut len: BstUlong = 0;
        let mut out: *const c_char = ptr::null();
        xgb_call!(
            native::api()?,
            XGBoosterSerializeToBuffer(self.handle, &mut len, &mut out)
        )?;
        // SAFETY: the buffer holds `len` bytes owned by the booster.
        Ok(unsafe { owned_slice(out as *const u8, len) })
    }

    /// Version stored by the last checkpoint, 0 without one or when the
    /// library has no checkpoint API.
    pub fn load_checkpoint(&mut self) -> Result<i32> {
        let api = native::api()?;
        let Some(load) = api.XGBoosterLoadRabitCheckpoint else {
            return Ok(0);
        };
        let mut version: c_int = 0;
        // SAFETY: the handle is live and `version` outlives the call.
        let status = unsafe { load(self.handle, &mut version) };
        native::check(api, status)?;
        Ok(version)
    }

    /// Store a checkpoint; a no-op when the library has no checkpoint API.
    pub fn save_checkpoint(&mut self) -> Result<()> {
        let api = native::api()?;
        let Some(save) = api.XGBoosterSaveRabitCheckpoint else {
            return Ok(());
        };
        // SAFETY: the handle is live.
        let status = unsafe { save(self.handle) };
        native::check(api, status)
    }

    /// Check `features` against the recorded features; the first call
    /// records them.
    pub fn validate_features(&mut self, features: &[Feature]) -> Result<()> {
        match &self.features {
            None => {
                self.features = Some(features.to_vec());
                Ok(())
            }
            Some(expected) => compare_features(expected, features),
        }
    }

    /// Check the features of `data`.
    pub fn validate(&mut self, data: &DMatrix) -> Result<()> {
        let features = data.features()?;
        self.validate_features(features)
    }

    /// Flat prediction buffer.
    pub fn predict_flat(&mut self, data: &DMatrix, options: &PredictOptions) -> Result<Vec<f32>> {
        if options.validate_features {
            self.validate(data)?;
        }

        let mut len: BstUlong = 0;
        let mut out: *const c_float = ptr::null();
        xgb_call!(
            native::api()?,
            XGBoosterPredict(
                self.handle,
                data.handle(),
                options.option_mask(),
                options.tree_limit,
                options.training as c_int,
                &mut len,
                &mut out
            )
        )?;
        // SAFETY: the library returned `len` floats owned by the booster.
        Ok(unsafe { owned_slice(out, len) })
    }

    /// Predictions shaped by row, and by group and feature for
    /// contributions and interactions.
    pub fn predict(&mut self, data: &DMatrix, options: &PredictOptions) -> Result<ArrayD<f32>> {
        let values = self.predict_flat(data, options)?;
        reshape_predictions(values, data.row_count()?, data.column_count()?, options)
    }

    /// Predict a single row of feature values.
    pub fn predict_features(
        &mut self,
        values: &[f32],
        options: &PredictOptions,
        missing: f32,
    ) -> Result<Vec<f32>> {
        let mut data = DMatrix::from_dense("predict", values, Shape::new(1, values.len()), missing)?;
        if let Some(features) = &self.features {
            data.set_features(Some(features.clone()))?;
        }
        self.predict_flat(&data, options)
    }

    /// Run one boosting round with the built-in objective.
    pub fn update(&mut self, iteration: IterationIndex, data: &DMatrix) -> Result<()> {
        self.validate(data)?;
        xgb_call!(
            native::api()?,
            XGBoosterUpdateOneIter(self.handle, iteration_arg(iteration)?, data.handle())
        )
    }

    /// Run one boosting round with a custom objective.
    pub fn update_with_objective<O>(&mut self, data: &DMatrix, objective: &mut O) -> Result<()>
    where
        O: ObjectiveFunction + ?Sized,
    {
        let options = PredictOptions {
            output_margin: true,
            training: true,
            ..PredictOptions::default()
        };
        let predictions = self.predict_flat(data, &options)?;
        let (gradient, hessian) = objective.gradient(&predictions, data)?;
        self.boost_inner(data, gradient, hessian, false)
    }

    /// Boost one round from explicit gradients and hessians.
    pub fn boost(&mut self, data: &DMatrix, gradient: &[f32], hessian: &[f32]) -> Result<()> {
        self.boost_inner(data, gradient.to_vec(), hessian.to_vec(), true)
    }

    fn boost_inner(
        &mut self,
        data: &DMatrix,
        mut gradient: Vec<f32>,
        mut hessian: Vec<f32>,
        validate: bool,
    ) -> Result<()> {
        if gradient.len() != hessian.len() {
            return Err(XGBoostError::config(format!(
                "Gradient and hessian lengths differ: {} != {}",
                gradient.len(),
                hessian.len()
            )));
        }
        if validate {
            self.validate(data)?;
        }

        let len = gradient.len() as BstUlong;
        xgb_call!(
            native::api()?,
            XGBoosterBoostOneIter(
                self.handle,
                data.handle(),
                gradient.as_mut_ptr(),
                hessian.as_mut_ptr(),
                len
            )
        )
    }

    /// Evaluate the configured metrics on each dataset, keyed by dataset
    /// name and metric name.
    pub fn evaluate(&mut self, iteration: IterationIndex, data: &[&DMatrix]) -> Result<Evaluation> {
        for matrix in data {
            self.validate(matrix)?;
        }

        let mut handles: Vec<DMatrixHandle> = data.iter().map(|matrix| matrix.handle()).collect();
        let c_names = data
            .iter()
            .map(|matrix| c_string(matrix.name()))
            .collect::<Result<Vec<CString>>>()?;
        let mut name_ptrs: Vec<*const c_char> = c_names.iter().map(|name| name.as_ptr()).collect();

        let mut out: *const c_char = ptr::null();
        xgb_call!(
            native::api()?,
            XGBoosterEvalOneIter(
                self.handle,
                iteration_arg(iteration)?,
                handles.as_mut_ptr(),
                name_ptrs.as_mut_ptr(),
                data.len() as BstUlong,
                &mut out
            )
        )?;
        // SAFETY: the result is a NUL terminated string owned by the booster.
        let output = unsafe { owned_string(out) }?;

        let names: Vec<&str> = data.iter().map(|matrix| matrix.name()).collect();
        parse_evaluation_with_names(&output, &names)
    }

    /// Like [`Booster::evaluate`], adding one custom metric per dataset
    /// computed from raw margins.
    pub fn evaluate_with<E>(
        &mut self,
        iteration: IterationIndex,
        data: &[&DMatrix],
        function: Option<&mut E>,
    ) -> Result<Evaluation>
    where
        E: EvaluationFunction + ?Sized,
    {
        let mut evaluation = self.evaluate(iteration, data)?;
        let Some(function) = function else {
            return Ok(evaluation);
        };

        let options = PredictOptions {
            output_margin: true,
            validate_features: false,
            ..PredictOptions::default()
        };
        for matrix in data {
            let predictions = self.predict_flat(matrix, &options)?;
            let (metric, value) = function.evaluate(&predictions, matrix)?;
            evaluation
                .entry(matrix.name().to_string())
                .or_default()
                .insert(metric, value);
        }
        Ok(evaluation)
    }

    /// Per-tree dumps.
    pub fn dump(&self, feature_map: Option<&Path>, with_stats: bool, format: ModelFormat) -> Result<Vec<String>> {
        let feature_map = match feature_map {
            Some(path) => c_path(path)?,
            None => c_string("")?,
        };
        let format = c_string(format.as_str())?;

        let mut len: BstUlong = 0;
        let mut out: *mut *const c_char = ptr::null_mut();
        xgb_call!(
            native::api()?,
            XGBoosterDumpModelEx(
                self.handle,
                feature_map.as_ptr(),
                with_stats as c_int,
                format.as_ptr(),
                &mut len,
                &mut out
            )
        )?;
        // SAFETY: the library returned `len` strings.
        unsafe { owned_strings(out, len) }
    }

    /// Per-tree dumps naming features from a list instead of a file.
    pub fn dump_with_features(
        &self,
        features: &[Feature],
        with_stats: bool,
        format: ModelFormat,
    ) -> Result<Vec<String>> {
        let names = features
            .iter()
            .map(|feature| c_string(&feature.name))
            .collect::<Result<Vec<CString>>>()?;
        let types = features
            .iter()
            .map(|feature| c_string(feature.feature_type.code()))
            .collect::<Result<Vec<CString>>>()?;
        let mut name_ptrs: Vec<*const c_char> = names.iter().map(|name| name.as_ptr()).collect();
        let mut type_ptrs: Vec<*const c_char> = types.iter().map(|code| code.as_ptr()).collect();
        let count = c_int::try_from(features.len()).map_err(|_| {
            XGBoostError::config(format!("{} features exceed the C API limit", features.len()))
        })?;
        let format = c_string(format.as_str())?;

        let mut len: BstUlong = 0;
        let mut out: *mut *const c_char = ptr::null_mut();
        xgb_call!(
            native::api()?,
            XGBoosterDumpModelExWithFeatures(
                self.handle,
                count,
                name_ptrs.as_mut_ptr(),
                type_ptrs.as_mut_ptr(),
                with_stats as c_int,
                format.as_ptr(),
                &mut len,
                &mut out
            )
        )?;
        // SAFETY: the library returned `len` strings.
        unsafe { owned_strings(out, len) }
    }

    /// Whole model dump as one document.
    pub fn dumped(&self, feature_map: Option<&Path>, with_stats: bool, format: ModelFormat) -> Result<String> {
        let trees = self.dump(feature_map, with_stats, format)?;
        Ok(format_model_dump(&trees, format))
    }

    /// Whole model dump naming features from a list.
    pub fn dumped_with_features(
        &self,
        features: &[Feature],
        with_stats: bool,
        format: ModelFormat,
    ) -> Result<String> {
        let trees = self.dump_with_features(features, with_stats, format)?;
        Ok(format_model_dump(&trees, format))
    }

    /// Feature importance from the text dump.
    pub fn score(&self, feature_map: Option<&Path>, importance: ImportanceType) -> Result<FeatureScore> {
        self.check_importance()?;
        let trees = self.dump(feature_map, importance.statistic().is_some(), ModelFormat::Text)?;
        importance::score(&trees, &trees, importance)
    }

    /// Feature importance naming features from a list.
    pub fn score_with_features(&self, features: &[Feature], importance: ImportanceType) -> Result<FeatureScore> {
        self.check_importance()?;
        let trees = self.dump_with_features(features, importance.statistic().is_some(), ModelFormat::Text)?;
        importance::score(&trees, &trees, importance)
    }

    fn check_importance(&self) -> Result<()> {
        match self.booster_type {
            Some(booster_type) if !booster_type.supports_importance() => Err(XGBoostError::config(format!(
                "Feature importance is not defined for booster {booster_type}"
            ))),
            _ => Ok(()),
        }
    }
}

fn iteration_arg(iteration: IterationIndex) -> Result<c_int> {
    c_int::try_from(iteration)
        .map_err(|_| XGBoostError::config(format!("iteration {iteration} exceeds the C API limit")))
}

/// Compare feature names, reporting names missing on each side.
pub(crate) fn compare_features(expected: &[Feature], actual: &[Feature]) -> Result<()> {
    if expected.iter().map(|f| &f.name).eq(actual.iter().map(|f| &f.name)) {
        return Ok(());
    }

    let booster_names: IndexSet<&str> = expected.iter().map(|f| f.name.as_str()).collect();
    let data_names: IndexSet<&str> = actual.iter().map(|f| f.name.as_str()).collect();
    let missing_in_data: Vec<&str> = booster_names.difference(&data_names).copied().collect();
    let missing_in_booster: Vec<&str> = data_names.difference(&booster_names).copied().collect();

    Err(XGBoostError::feature(format!(
        "Feature names mismatch. Missing in data: {missing_in_data:?}. Missing in booster: {missing_in_booster:?}."
    )))
}

impl fmt::Debug for Booster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Booster")
            .field("booster_type", &self.booster_type)
            .field("features", &self.features.as_ref().map(Vec::len))
            .finish()
    }
}

impl Drop for Booster {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        match native::api() {
            Ok(api) => {
                if let Err(err) = xgb_call!(api, XGBoosterFree(self.handle)) {
                    log::error!("Failed to free booster: {}", err);
                }
            }
            Err(err) => log::error!("Failed to free booster: {}", err),
        }
        self.handle = ptr::null_mut();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(names: &[&str]) -> Vec<Feature> {
        names.iter().map(|name| Feature::quantitative(*name)).collect()
    }

    #[test]
    fn test_options_defaults() {
        let options = BoosterOptions::default();
        assert!(options.validate_parameters);
        assert!(options.model_path.is_none());
        assert!(options.parameters.is_empty());

        let options = BoosterOptions::new(Parameters::new().with("max_depth", 3))
            .model_path("model.json")
            .validate_parameters(false);
        assert_eq!(options.parameters.get("max_depth"), Some("3"));
        assert_eq!(options.model_path, Some(PathBuf::from("model.json")));
        assert!(!options.validate_parameters);
    }

    #[test]
    fn test_matching_features() {
        let expected = features(&["a", "b"]);
        assert!(compare_features(&expected, &features(&["a", "b"])).is_ok());
    }

    #[test]
    fn test_types_are_not_compared() {
        let expected = vec![Feature::indicator("a")];
        assert!(compare_features(&expected, &features(&["a"])).is_ok());
    }

    #[test]
    fn test_mismatch_lists_both_sides() {
        let err = compare_features(&features(&["a", "b"]), &features(&["a", "c"])).unwrap_err();
        assert_eq!(err.category(), "feature");
        let message = err.to_string();
        assert!(message.contains("Missing in data: [\"b\"]"), "{message}");
        assert!(message.contains("Missing in booster: [\"c\"]"), "{message}");
    }

    #[test]
    fn test_order_matters() {
        assert!(compare_features(&features(&["a", "b"]), &features(&["b", "a"])).is_err());
    }
}

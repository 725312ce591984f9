//! Runtime binding of the XGBoost C API.
//!
//! The shared library is opened once per process with `libloading` and its
//! entry points are copied into a [`NativeApi`] table that lives for the rest
//! of the process. Every call that returns a non-zero status is translated into
//! [`XGBoostError::Native`] carrying `XGBGetLastError()`.
//!
//! The library is looked up at the path in `XGBOOST_LIB_PATH` first, then
//! under the platform file name through the system loader.

use libloading::Library;
use std::env;
use std::ffi::{c_char, c_float, c_int, c_uint, c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::slice;
use std::sync::OnceLock;

use crate::core::constants::{LIBRARY_NAMES, LIBRARY_PATH_ENV};
use crate::core::error::{Result, XGBoostError};
use crate::core::types::Version;

/// Opaque native data matrix handle.
pub type DMatrixHandle = *mut c_void;

/// Opaque native booster handle.
pub type BoosterHandle = *mut c_void;

/// Length type of the C API (`bst_ulong`).
pub type BstUlong = u64;

/// Signature of the native log callback.
pub type NativeLogCallback = unsafe extern "C" fn(*const c_char);

/// Declares the function table and its loader from one symbol list.
macro_rules! native_api {
    (
        required {
            $( fn $name:ident ( $( $arg:ty ),* $(,)? ) -> $ret:ty; )*
        }
        optional {
            $( fn $opt_name:ident ( $( $opt_arg:ty ),* $(,)? ) -> $opt_ret:ty; )*
        }
    ) => {
        /// Entry points of the loaded XGBoost library.
        #[allow(non_snake_case)]
        pub struct NativeApi {
            _library: Library,
            $( pub(crate) $name: unsafe extern "C" fn( $( $arg ),* ) -> $ret, )*
            $( pub(crate) $opt_name: Option<unsafe extern "C" fn( $( $opt_arg ),* ) -> $opt_ret>, )*
        }

        impl NativeApi {
            #[allow(non_snake_case)]
            fn from_library(library: Library) -> std::result::Result<Self, String> {
                $(
                    // SAFETY: the declared signature matches the C API header.
                    let $name = unsafe {
                        symbol::<unsafe extern "C" fn( $( $arg ),* ) -> $ret>(&library, stringify!($name))?
                    };
                )*
                $(
                    // SAFETY: as above; absence is tolerated.
                    let $opt_name = unsafe {
                        symbol::<unsafe extern "C" fn( $( $opt_arg ),* ) -> $opt_ret>(&library, stringify!($opt_name)).ok()
                    };
                )*
                Ok(NativeApi {
                    _library: library,
                    $( $name, )*
                    $( $opt_name, )*
                })
            }
        }

        impl std::fmt::Debug for NativeApi {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct("NativeApi")
                    $( .field(stringify!($opt_name), &self.$opt_name.is_some()) )*
                    .finish_non_exhaustive()
            }
        }
    };
}

native_api! {
    required {
        fn XGBGetLastError() -> *const c_char;
        fn XGBRegisterLogCallback(Option<NativeLogCallback>) -> c_int;

        fn XGDMatrixCreateFromFile(*const c_char, c_int, *mut DMatrixHandle) -> c_int;
        fn XGDMatrixCreateFromMat_omp(*const c_float, BstUlong, BstUlong, c_float, *mut DMatrixHandle, c_int) -> c_int;
        fn XGDMatrixSliceDMatrixEx(DMatrixHandle, *const c_int, BstUlong, *mut DMatrixHandle, c_int) -> c_int;
        fn XGDMatrixFree(DMatrixHandle) -> c_int;
        fn XGDMatrixSaveBinary(DMatrixHandle, *const c_char, c_int) -> c_int;
        fn XGDMatrixSetFloatInfo(DMatrixHandle, *const c_char, *const c_float, BstUlong) -> c_int;
        fn XGDMatrixSetUIntInfo(DMatrixHandle, *const c_char, *const c_uint, BstUlong) -> c_int;
        fn XGDMatrixGetFloatInfo(DMatrixHandle, *const c_char, *mut BstUlong, *mut *const c_float) -> c_int;
        fn XGDMatrixGetUIntInfo(DMatrixHandle, *const c_char, *mut BstUlong, *mut *const c_uint) -> c_int;
        fn XGDMatrixNumRow(DMatrixHandle, *mut BstUlong) -> c_int;
        fn XGDMatrixNumCol(DMatrixHandle, *mut BstUlong) -> c_int;

        fn XGBoosterCreate(*const DMatrixHandle, BstUlong, *mut BoosterHandle) -> c_int;
        fn XGBoosterFree(BoosterHandle) -> c_int;
        fn XGBoosterSetParam(BoosterHandle, *const c_char, *const c_char) -> c_int;
        fn XGBoosterUpdateOneIter(BoosterHandle, c_int, DMatrixHandle) -> c_int;
        fn XGBoosterBoostOneIter(BoosterHandle, DMatrixHandle, *mut c_float, *mut c_float, BstUlong) -> c_int;
        fn XGBoosterEvalOneIter(BoosterHandle, c_int, *mut DMatrixHandle, *mut *const c_char, BstUlong, *mut *const c_char) -> c_int;
        fn XGBoosterPredict(BoosterHandle, DMatrixHandle, c_int, c_uint, c_int, *mut BstUlong, *mut *const c_float) -> c_int;
        fn XGBoosterLoadModel(BoosterHandle, *const c_char) -> c_int;
        fn XGBoosterSaveModel(BoosterHandle, *const c_char) -> c_int;
        fn XGBoosterLoadModelFromBuffer(BoosterHandle, *const c_void, BstUlong) -> c_int;
        fn XGBoosterSerializeToBuffer(BoosterHandle, *mut BstUlong, *mut *const c_char) -> c_int;
        fn XGBoosterUnserializeFromBuffer(BoosterHandle, *const c_void, BstUlong) -> c_int;
        fn XGBoosterLoadJsonConfig(BoosterHandle, *const c_char) -> c_int;
        fn XGBoosterSaveJsonConfig(BoosterHandle, *mut BstUlong, *mut *const c_char) -> c_int;
        fn XGBoosterDumpModelEx(BoosterHandle, *const c_char, c_int, *const c_char, *mut BstUlong, *mut *mut *const c_char) -> c_int;
        fn XGBoosterDumpModelExWithFeatures(BoosterHandle, c_int, *mut *const c_char, *mut *const c_char, c_int, *const c_char, *mut BstUlong, *mut *mut *const c_char) -> c_int;
        fn XGBoosterGetAttr(BoosterHandle, *const c_char, *mut *const c_char, *mut c_int) -> c_int;
        fn XGBoosterSetAttr(BoosterHandle, *const c_char, *const c_char) -> c_int;
        fn XGBoosterGetAttrNames(BoosterHandle, *mut BstUlong, *mut *mut *const c_char) -> c_int;
    }
    optional {
        fn XGBoostVersion(*mut c_int, *mut c_int, *mut c_int) -> ();
        fn XGBoosterLoadRabitCheckpoint(BoosterHandle, *mut c_int) -> c_int;
        fn XGBoosterSaveRabitCheckpoint(BoosterHandle) -> c_int;
    }
}

static NATIVE: OnceLock<std::result::Result<NativeApi, String>> = OnceLock::new();

/// Copy a function pointer out of the library.
///
/// # Safety
/// `T` must be the function pointer type matching the symbol's C signature.
unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> std::result::Result<T, String> {
    // SAFETY: forwarded to the caller.
    let symbol = unsafe { library.get::<T>(name.as_bytes()) }
        .map_err(|err| format!("missing symbol {name}: {err}"))?;
    Ok(*symbol)
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = env::var_os(LIBRARY_PATH_ENV) {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }
    candidates.extend(LIBRARY_NAMES.iter().map(PathBuf::from));
    candidates
}

fn load() -> std::result::Result<NativeApi, String> {
    let mut failures = Vec::new();

    for candidate in candidate_paths() {
        // SAFETY: loading XGBoost runs only its static initializers.
        match unsafe { Library::new(&candidate) } {
            Ok(library) => {
                log::debug!("Loaded XGBoost library from {}", candidate.display());
                let api = NativeApi::from_library(library)?;
                if api.XGBoosterLoadRabitCheckpoint.is_none() {
                    log::debug!("XGBoost library has no rabit checkpoint API, checkpoints disabled");
                }
                return Ok(api);
            }
            Err(err) => failures.push(format!("{}: {}", candidate.display(), err)),
        }
    }

    Err(format!(
        "could not load the XGBoost shared library (set {}): {}",
        LIBRARY_PATH_ENV,
        failures.join("; ")
    ))
}

/// Loaded native API, opening the library on first use.
pub fn api() -> Result<&'static NativeApi> {
    NATIVE
        .get_or_init(load)
        .as_ref()
        .map_err(|message| XGBoostError::library_unavailable(message.clone()))
}

/// Whether the XGBoost shared library could be loaded.
pub fn is_available() -> bool {
    api().is_ok()
}

/// Version reported by the loaded library.
pub fn version() -> Result<Version> {
    let api = api()?;
    let version_fn = api
        .XGBoostVersion
        .ok_or_else(|| XGBoostError::library_unavailable("XGBoostVersion is not exported"))?;

    let (mut major, mut minor, mut patch) = (-1, -1, -1);
    // SAFETY: the three out pointers are valid for writes.
    unsafe { version_fn(&mut major, &mut minor, &mut patch) };

    if major < 0 || minor < 0 || patch < 0 {
        return Err(XGBoostError::native("XGBoostVersion did not report a version"));
    }
    Ok(Version {
        major,
        minor,
        patch,
    })
}

/// Translate a C API status code.
pub(crate) fn check(api: &NativeApi, status: c_int) -> Result<()> {
    if status == 0 {
        return Ok(());
    }
    // SAFETY: XGBGetLastError returns a thread local, NUL terminated string.
    let message = unsafe {
        let ptr = (api.XGBGetLastError)();
        if ptr.is_null() {
            String::from("unknown XGBoost error")
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    };
    log::debug!("XGBoost call failed with status {}: {}", status, message);
    Err(XGBoostError::native(message))
}

/// Call a C API function through the table and check its status.
macro_rules! xgb_call {
    ($api:expr, $func:ident ( $( $arg:expr ),* $(,)? )) => {{
        let api: &$crate::core::native::NativeApi = $api;
        #[allow(unused_unsafe)]
        let status = unsafe { (api.$func)( $( $arg ),* ) };
        $crate::core::native::check(api, status)
    }};
}
pub(crate) use xgb_call;

/// NUL terminated copy of a string argument.
pub(crate) fn c_string(value: &str) -> Result<CString> {
    Ok(CString::new(value)?)
}

/// NUL terminated copy of a path argument.
pub(crate) fn c_path(path: &Path) -> Result<CString> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Ok(CString::new(path.as_os_str().as_bytes())?)
    }
    #[cfg(not(unix))]
    {
        let value = path.to_str().ok_or_else(|| {
            XGBoostError::config(format!("path {} is not valid UTF-8", path.display()))
        })?;
        c_string(value)
    }
}

/// Owned copy of a string returned by the library.
///
/// # Safety
/// `ptr` must be null or point to a NUL terminated string.
pub(crate) unsafe fn owned_string(ptr: *const c_char) -> Result<String> {
    if ptr.is_null() {
        return Err(XGBoostError::native("XGBoost returned a null string"));
    }
    // SAFETY: forwarded to the caller.
    let value = unsafe { CStr::from_ptr(ptr) };
    Ok(value.to_string_lossy().into_owned())
}

/// Owned copies of a string array returned by the library.
///
/// # Safety
/// `ptr` must point to `len` NUL terminated strings.
pub(crate) unsafe fn owned_strings(ptr: *mut *const c_char, len: BstUlong) -> Result<Vec<String>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(XGBoostError::native("XGBoost returned a null string array"));
    }
    // SAFETY: forwarded to the caller.
    let pointers = unsafe { slice::from_raw_parts(ptr, len as usize) };
    pointers
        .iter()
        // SAFETY: every element is a string owned by the library.
        .map(|&item| unsafe { owned_string(item) })
        .collect()
}

/// Owned copy of a numeric buffer returned by the library.
///
/// # Safety
/// `ptr` must point to `len` initialized values.
pub(crate) unsafe fn owned_slice<T: Copy>(ptr: *const T, len: BstUlong) -> Vec<T> {
    if len == 0 || ptr.is_null() {
        return Vec::new();
    }
    // SAFETY: forwarded to the caller.
    unsafe { slice::from_raw_parts(ptr, len as usize) }.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_paths_include_platform_names() {
        let candidates = candidate_paths();
        for name in LIBRARY_NAMES {
            assert!(candidates.iter().any(|path| path == Path::new(name)));
        }
    }

    #[test]
    fn test_c_string_rejects_interior_nul() {
        assert!(c_string("label").is_ok());
        let err = c_string("la\0bel").unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_owned_slice_empty() {
        let values: Vec<f32> = unsafe { owned_slice(std::ptr::null(), 0) };
        assert!(values.is_empty());
    }

    #[test]
    fn test_owned_strings_round_trip() {
        let owned = [CString::new("a").unwrap(), CString::new("bc").unwrap()];
        let mut pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
        let strings = unsafe { owned_strings(pointers.as_mut_ptr(), pointers.len() as BstUlong) }.unwrap();
        assert_eq!(strings, vec!["a".to_string(), "bc".to_string()]);
    }

    #[test]
    fn test_availability_is_consistent() {
        assert_eq!(is_available(), api().is_ok());
        if !is_available() {
            let err = api().err().unwrap();
            assert_eq!(err.category(), "library_unavailable");
        }
    }

    #[test]
    fn test_api_debug_lists_optional_symbols() {
        if let Ok(api) = api() {
            let text = format!("{api:?}");
            assert!(text.starts_with("NativeApi"));
            assert!(text.contains("XGBoosterSaveRabitCheckpoint"));
        }
    }
}

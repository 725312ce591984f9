//! Forwarding of native `LOG(INFO)` output.
//!
//! XGBoost accepts a single process-wide log callback. This module owns that
//! slot: the native library always calls [`forward`], which hands the message
//! to the registered Rust callback or, when none is registered, to the `log`
//! facade under the `xgboost` target.
//!
//! The last registration wins. Changing the callback while another thread is
//! training is not supported; the slot is guarded only so that concurrent
//! readers never observe a torn value.

use std::ffi::{c_char, CStr};
use std::sync::RwLock;

use crate::core::error::Result;
use crate::core::native::{self, xgb_call};

/// Type alias for logging callback functions.
pub type LogCallback = fn(&str);

/// Target used when native messages are forwarded to the `log` facade.
pub const NATIVE_LOG_TARGET: &str = "xgboost";

static LOG_CALLBACK: RwLock<Option<LogCallback>> = RwLock::new(None);

/// Entry point handed to `XGBRegisterLogCallback`.
unsafe extern "C" fn forward(message: *const c_char) {
    if message.is_null() {
        return;
    }
    // SAFETY: the library passes a NUL terminated string valid for this call.
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    dispatch(&message);
}

fn dispatch(message: &str) {
    let callback = match LOG_CALLBACK.read() {
        Ok(slot) => *slot,
        Err(poisoned) => *poisoned.into_inner(),
    };
    match callback {
        Some(callback) => callback(message),
        None => log::info!(target: NATIVE_LOG_TARGET, "{}", message.trim_end()),
    }
}

fn store(callback: Option<LogCallback>) {
    match LOG_CALLBACK.write() {
        Ok(mut slot) => *slot = callback,
        Err(poisoned) => *poisoned.into_inner() = callback,
    }
}

/// Register the callback receiving native log messages.
///
/// `None` restores forwarding to the `log` facade.
pub fn register_log_callback(callback: Option<LogCallback>) -> Result<()> {
    store(callback);
    let api = native::api()?;
    xgb_call!(api, XGBRegisterLogCallback(Some(forward)))
}

/// Currently registered callback, if any.
pub fn log_callback() -> Option<LogCallback> {
    match LOG_CALLBACK.read() {
        Ok(slot) => *slot,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Initialize `env_logger`, ignoring an already installed logger.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

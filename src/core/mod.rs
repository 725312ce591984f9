//! Core infrastructure for the XGBoost bindings.
//!
//! # Organization
//!
//! - [`types`]: Shared enumerations and value types
//! - [`constants`]: C API constants and attribute names
//! - [`error`]: Error handling and error types
//! - [`native`]: Runtime binding of the XGBoost C API
//! - [`logging`]: Native log forwarding and `env_logger` setup
//!
//! # Usage
//!
//! ```rust
//! use xgboost_rust::core::{
//!     types::{BoosterType, FeatureType},
//!     constants::DEFAULT_MISSING_VALUE,
//!     error::{Result, XGBoostError},
//! };
//!
//! let booster: BoosterType = "dart".parse()?;
//! assert!(booster.supports_importance());
//! assert_eq!(FeatureType::Indicator.code(), "i");
//! assert_eq!(DEFAULT_MISSING_VALUE, f32::MAX);
//! # Ok::<(), XGBoostError>(())
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod native;
pub mod types;

pub use constants::*;
pub use error::{Result, XGBoostError};
pub use logging::{register_log_callback, LogCallback};
pub use types::*;

use std::sync::OnceLock;

/// Version information for the core module
pub const CORE_MODULE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the loaded native library supports.
#[derive(Debug, Clone, Default)]
pub struct CoreCapabilities {
    /// The shared library and all required symbols were loaded
    pub native_library: bool,
    /// Version reported by the library
    pub version: Option<Version>,
    /// The rabit checkpoint API is exported
    pub checkpoints: bool,
}

impl CoreCapabilities {
    /// Probe the native library.
    pub fn current() -> Self {
        match native::api() {
            Ok(api) => CoreCapabilities {
                native_library: true,
                version: native::version().ok(),
                checkpoints: api.XGBoosterLoadRabitCheckpoint.is_some()
                    && api.XGBoosterSaveRabitCheckpoint.is_some(),
            },
            Err(_) => CoreCapabilities::default(),
        }
    }

    /// Get a summary of available capabilities
    pub fn summary(&self) -> String {
        if !self.native_library {
            return String::from("Core capabilities: native library unavailable");
        }

        let mut features = vec![String::from("Native Library")];
        if let Some(version) = self.version {
            features.push(format!("XGBoost {version}"));
        }
        if self.checkpoints {
            features.push(String::from("Checkpoints"));
        }
        format!("Core capabilities: {}", features.join(", "))
    }
}

static CORE_STATE: OnceLock<CoreCapabilities> = OnceLock::new();

/// Initialize logging, load the native library and install log forwarding.
pub fn initialize_core() -> Result<()> {
    logging::init_logging();
    native::api()?;

    if logging::log_callback().is_none() {
        logging::register_log_callback(None)?;
    }

    let capabilities = CORE_STATE.get_or_init(CoreCapabilities::current);
    log::debug!("{}", capabilities.summary());
    Ok(())
}

/// Check if the core module is initialized
pub fn is_core_initialized() -> bool {
    CORE_STATE.get().is_some()
}

/// Get current core capabilities
pub fn core_capabilities() -> CoreCapabilities {
    CORE_STATE
        .get()
        .cloned()
        .unwrap_or_else(CoreCapabilities::current)
}

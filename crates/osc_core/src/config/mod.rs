//! Configuration for the analysis engine.
//!
//! TOML-based settings organized into logical sections, with atomic file
//! writes (write to temp, then rename) and defaults for any missing key.
//!
//! # Example
//!
//! ```no_run
//! use osc_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new("analysis.toml");
//! config.load_or_create().unwrap();
//!
//! let lambda = config.settings().baseline.lambda;
//! config.settings_mut().spectral.period_limit = 45.0;
//! config.save().unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    BaselineSettings, LoggingSettings, PeakDetectionSettings, Settings, SpatialSettings,
    SpectralSettings,
};

//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field carries a default so partial config files load cleanly.

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, FourierExtractor};
use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Baseline estimation parameters.
    #[serde(default)]
    pub baseline: BaselineSettings,

    /// Spectral peak extraction parameters.
    #[serde(default)]
    pub spectral: SpectralSettings,

    /// Time-domain peak detection parameters.
    #[serde(default)]
    pub peak_detection: PeakDetectionSettings,

    /// Spatial aggregation parameters.
    #[serde(default)]
    pub spatial: SpatialSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default log level when RUST_LOG is not set.
    #[serde(default)]
    pub level: LogLevel,
}

/// Asymmetric least-squares baseline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSettings {
    /// Smoothness parameter (larger is smoother).
    #[serde(default = "default_lambda")]
    pub lambda: f64,

    /// Asymmetry parameter (smaller keeps the baseline below peaks).
    #[serde(default = "default_asymmetry")]
    pub asymmetry: f64,

    /// Number of reweighting iterations.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

fn default_lambda() -> f64 {
    1e6
}

fn default_asymmetry() -> f64 {
    0.01
}

fn default_iterations() -> usize {
    10
}

impl Default for BaselineSettings {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
            asymmetry: default_asymmetry(),
            iterations: default_iterations(),
        }
    }
}

/// Spectral peak extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralSettings {
    /// Zero-padded transform length; must be >= the trace length.
    #[serde(default = "default_pad_len")]
    pub pad_len: usize,

    /// Only periods below this limit are searched.
    #[serde(default = "default_period_limit")]
    pub period_limit: f64,

    /// Neighborhood radius for the local-maximum test.
    #[serde(default = "default_radius")]
    pub radius: usize,
}

fn default_pad_len() -> usize {
    2048
}

fn default_period_limit() -> f64 {
    60.0
}

fn default_radius() -> usize {
    3
}

impl Default for SpectralSettings {
    fn default() -> Self {
        Self {
            pad_len: default_pad_len(),
            period_limit: default_period_limit(),
            radius: default_radius(),
        }
    }
}

impl SpectralSettings {
    /// Build a Fourier extractor from these settings.
    pub fn build_extractor(&self) -> AnalysisResult<FourierExtractor> {
        FourierExtractor::with_params(self.pad_len, self.period_limit, self.radius)
    }
}

/// Time-domain peak detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakDetectionSettings {
    /// Fraction of the dominant period enforcing minimum peak spacing.
    #[serde(default = "default_spacing_fraction")]
    pub spacing_fraction: f64,

    /// Minimum peak amplitude.
    #[serde(default = "default_height_threshold")]
    pub height_threshold: f64,
}

fn default_spacing_fraction() -> f64 {
    0.6
}

fn default_height_threshold() -> f64 {
    1.0
}

impl Default for PeakDetectionSettings {
    fn default() -> Self {
        Self {
            spacing_fraction: default_spacing_fraction(),
            height_threshold: default_height_threshold(),
        }
    }
}

/// Spatial aggregation parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialSettings {
    /// Power threshold for the filtered period map; 0 disables it.
    #[serde(default)]
    pub power_threshold: f64,
}

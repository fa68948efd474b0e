//! Core types for trace analysis.

use serde::{Deserialize, Serialize};

/// One-sided power spectrum on a period axis.
///
/// The period axis is strictly decreasing with frequency; the DC bin is
/// mapped to `f64::INFINITY` rather than dividing by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrum {
    /// Period per bin, in the same time units as `dt`.
    pub period: Vec<f64>,
    /// Power per bin (squared magnitude scaled by the transform length).
    pub power: Vec<f64>,
}

impl Spectrum {
    /// Number of spectral bins.
    pub fn len(&self) -> usize {
        self.power.len()
    }

    /// Check if the spectrum is empty.
    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

/// Dominant spectral peak: a period and its power.
///
/// Absence of a qualifying peak is expressed as `Option::None` by the
/// extractors, never as NaN, so callers cannot silently propagate a
/// sentinel through arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominantPeak {
    /// Dominant period, in the same time units as `dt`.
    pub period: f64,
    /// Spectral power at the dominant period.
    pub power: f64,
}

/// Peaks detected in the time domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakSet {
    /// Sample indices of the peaks, strictly increasing.
    pub indices: Vec<usize>,
    /// Times of the peaks (from the supplied time axis).
    pub times: Vec<f64>,
    /// Trace amplitudes at the peaks.
    pub amplitudes: Vec<f64>,
    /// Effective minimum peak separation used, in samples.
    pub min_spacing_samples: usize,
    /// Height threshold used.
    pub height_threshold: f64,
}

impl PeakSet {
    /// Number of detected peaks.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if no peaks were detected.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Phase lag between two traces at maximum cross-correlation.
///
/// Sign convention: positive lag means the second trace leads the first.
/// A copy of the first trace delayed by `k` samples yields a lag of
/// `-k * dt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseLagResult {
    /// Lag at peak correlation, in samples.
    pub lag_samples: isize,
    /// Lag at peak correlation, in time units.
    pub lag_seconds: f64,
    /// Correlation value at the peak, before any rescale.
    pub peak_value: f64,
    /// Centered same-length correlation curve. Rescaled to [-1, 1] when
    /// `rescaled` is true; raw values otherwise.
    pub correlation: Vec<f64>,
    /// Whether the presentation rescale was applied. False when the
    /// correlation was constant across all lags (zero span).
    pub rescaled: bool,
}

/// Autocorrelation-envelope half-life of a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalfLifeResult {
    /// Half-life in the time axis units, or `None` if the envelope never
    /// reaches half its zero-lag value within the trace.
    pub value: Option<f64>,
    /// Sampling interval estimated as the median of consecutive time
    /// differences.
    pub sample_interval: f64,
}

/// Error types for analysis operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Malformed arguments: length, sign, or domain violations.
    /// Raised before any computation begins.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numerically degenerate data: zero-range normalization, singular
    /// solve, flat autocorrelation.
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Batch operation cancelled via its cancel handle.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_peak_set_reports_empty() {
        let set = PeakSet {
            indices: vec![],
            times: vec![],
            amplitudes: vec![],
            min_spacing_samples: 1,
            height_threshold: 0.0,
        };
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn errors_format_with_context() {
        let err = AnalysisError::InvalidInput("trace too short".into());
        assert!(err.to_string().contains("trace too short"));

        let err = AnalysisError::NumericalDegeneracy("flat trace".into());
        assert!(err.to_string().contains("flat trace"));
    }

    #[test]
    fn dominant_peak_serializes_round_trip() {
        let peak = DominantPeak {
            period: 20.0,
            power: 1.5,
        };
        let json = serde_json::to_string(&peak).unwrap();
        let back: DominantPeak = serde_json::from_str(&json).unwrap();
        assert_eq!(peak, back);
    }
}

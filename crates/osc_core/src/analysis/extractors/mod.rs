//! Periodicity extractors.
//!
//! This module defines the `PeriodicityExtractor` trait and its
//! implementations. The spatial aggregator depends only on the trait, so
//! any extractor satisfying the contract is substitutable (including
//! synthetic ones in tests).

mod fourier;

pub use fourier::{extract_dominant_period, FourierExtractor, DEFAULT_PAD_LEN};

use crate::analysis::types::{AnalysisResult, DominantPeak};

/// Trait for dominant-period extraction from a single trace.
///
/// `Ok(None)` means no qualifying peak was found, which is a legitimate
/// outcome for an aperiodic trace, not a failure.
pub trait PeriodicityExtractor: Send + Sync {
    /// Name of this extractor.
    fn name(&self) -> &str;

    /// Short description of the method.
    fn description(&self) -> &str;

    /// Extract the dominant period and its power from a trace.
    fn extract(&self, trace: &[f64], dt: f64) -> AnalysisResult<Option<DominantPeak>>;
}

/// Factory for creating extractors by name.
pub fn create_extractor(name: &str) -> Option<Box<dyn PeriodicityExtractor>> {
    match name.to_lowercase().as_str() {
        "fourier" | "fft" | "spectral" => Some(Box::new(FourierExtractor::new())),
        _ => None,
    }
}

/// Get a list of available extractor names.
pub fn available_extractors() -> Vec<&'static str> {
    vec!["fourier"]
}

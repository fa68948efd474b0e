//! Oscillation characterization for time-series traces.
//!
//! # Architecture
//!
//! The engine consists of pure functions over in-memory traces (samples
//! plus a sampling interval `dt`); no file formats or plotting live here.
//!
//! 1. **Baseline** (`baseline`): asymmetric least-squares baseline for
//!    drift removal before peak analysis.
//!
//! 2. **Periodicity extraction** (`extractors`): Hann-windowed,
//!    zero-padded power spectrum with a dominant-period peak pick, behind
//!    the `PeriodicityExtractor` trait.
//!
//! 3. **Peak detection** (`peaks`): time-domain peaks with a minimum
//!    spacing parameterized by the dominant period.
//!
//! 4. **Phase lag** (`correlation`): lag of maximum cross-correlation
//!    between two traces.
//!
//! 5. **Half-life** (`half_life`): autocorrelation-envelope decay time,
//!    single-trace and population summaries.
//!
//! 6. **Spatial maps** (`spatial`): the extractor applied per cell of an
//!    ROI grid, reshaped into period/power maps with failure isolation.
//!
//! # Usage
//!
//! ```ignore
//! use osc_core::analysis::{
//!     estimate_baseline, extract_dominant_period, detect_peaks,
//!     cross_correlate, half_life, aggregate_spatial_maps,
//!     FourierExtractor, RoiGrid, RasterOrder,
//! };
//!
//! // Baseline-correct a trace, find its rhythm, then its peaks.
//! let baseline = estimate_baseline(&trace, 1e6, 0.01, 10)?;
//! let corrected: Vec<f64> = trace.iter().zip(&baseline).map(|(y, b)| y - b).collect();
//! let (peak, spectrum) = extract_dominant_period(&corrected, dt, 60.0, 3)?;
//! if let Some(peak) = peak {
//!     let peaks = detect_peaks(&corrected, &times, dt, peak.period, 0.6, 1.0)?;
//! }
//!
//! // Grid maps.
//! let grid = RoiGrid::from_rows(cell_traces, dt, par, RasterOrder::RowMajor)?;
//! let maps = aggregate_spatial_maps(&grid, &FourierExtractor::new(), 0.05, None)?;
//! ```

mod baseline;
mod correlation;
pub mod extractors;
mod half_life;
mod peaks;
mod spatial;
pub mod types;

// Re-export main types from types module
pub use types::{
    AnalysisError, AnalysisResult, DominantPeak, HalfLifeResult, PeakSet, PhaseLagResult, Spectrum,
};

// Re-export baseline estimation
pub use baseline::estimate_baseline;

// Re-export periodicity extraction
pub use extractors::{
    available_extractors, create_extractor, extract_dominant_period, FourierExtractor,
    PeriodicityExtractor, DEFAULT_PAD_LEN,
};

// Re-export peak detection
pub use peaks::detect_peaks;

// Re-export phase-lag estimation
pub use correlation::cross_correlate;

// Re-export half-life estimation
pub use half_life::{half_life, population_half_life, PopulationHalfLife};

// Re-export spatial aggregation
pub use spatial::{
    aggregate_spatial_maps, CancelHandle, CellOutcome, CellOutcomeKind, RasterOrder, RoiGrid,
    SpatialMap, SpatialMaps,
};

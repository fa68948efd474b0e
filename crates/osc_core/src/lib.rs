//! Osc Core - Oscillation characterization for noisy time-series traces.
//!
//! This crate contains the numerical engine with zero I/O dependencies.
//! It consumes in-memory traces (samples plus a sampling interval) and
//! produces in-memory results: baselines, spectra, peak sets, phase lags,
//! half-lives, and spatial maps. Reading spreadsheets or image stacks and
//! all plotting belong to the callers.

pub mod analysis;
pub mod config;
pub mod logging;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}

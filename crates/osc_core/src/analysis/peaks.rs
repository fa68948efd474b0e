//! Period-informed peak detection on a trace.
//!
//! Local maxima above a height threshold, subject to a minimum spacing
//! derived from the dominant oscillation period. When two candidates sit
//! closer than the minimum spacing, the taller one is retained.

use super::types::{AnalysisError, AnalysisResult, PeakSet};

/// Detect oscillation peaks in a trace.
///
/// The minimum peak separation is `round(f * period / dt)` samples,
/// floored to 1. Plateaus count as a single peak at their midpoint.
///
/// # Arguments
/// * `trace` - Input samples (typically normalized)
/// * `times` - Time axis, same length as `trace`
/// * `dt` - Sampling interval
/// * `period` - Dominant oscillation period; callers holding an absent
///   peak pick must supply an explicit default instead
/// * `spacing_fraction` - Fraction of the period enforcing separation, in (0, 1]
/// * `height_threshold` - Minimum peak amplitude
pub fn detect_peaks(
    trace: &[f64],
    times: &[f64],
    dt: f64,
    period: f64,
    spacing_fraction: f64,
    height_threshold: f64,
) -> AnalysisResult<PeakSet> {
    let n = trace.len();
    if n < 3 {
        return Err(AnalysisError::InvalidInput(format!(
            "Trace length {} is too short (need >= 3)",
            n
        )));
    }
    if times.len() != n {
        return Err(AnalysisError::InvalidInput(format!(
            "Time axis length {} does not match trace length {}",
            times.len(),
            n
        )));
    }
    if !(dt > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Sampling interval must be > 0, got {}",
            dt
        )));
    }
    if !period.is_finite() || period <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Dominant period must be a positive finite value, got {}",
            period
        )));
    }
    if !(spacing_fraction > 0.0 && spacing_fraction <= 1.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Spacing fraction must be in (0, 1], got {}",
            spacing_fraction
        )));
    }

    let min_spacing = ((spacing_fraction * period / dt).round() as usize).max(1);

    let candidates = local_maxima(trace);
    let candidates: Vec<usize> = candidates
        .into_iter()
        .filter(|&i| trace[i] >= height_threshold)
        .collect();
    let selected = enforce_spacing(&candidates, trace, min_spacing);

    Ok(PeakSet {
        times: selected.iter().map(|&i| times[i]).collect(),
        amplitudes: selected.iter().map(|&i| trace[i]).collect(),
        indices: selected,
        min_spacing_samples: min_spacing,
        height_threshold,
    })
}

/// Indices of local maxima, with plateaus resolved to their midpoint.
fn local_maxima(trace: &[f64]) -> Vec<usize> {
    let n = trace.len();
    let mut maxima = Vec::new();

    let mut i = 1;
    while i < n - 1 {
        if trace[i - 1] < trace[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && trace[ahead] == trace[i] {
                ahead += 1;
            }
            if trace[ahead] < trace[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    maxima
}

/// Greedy spacing enforcement: taller peaks claim their neighborhood.
fn enforce_spacing(candidates: &[usize], trace: &[f64], min_spacing: usize) -> Vec<usize> {
    let m = candidates.len();
    let mut keep = vec![true; m];

    // Visit candidates from tallest to shortest; earlier index wins ties.
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| {
        trace[candidates[b]]
            .partial_cmp(&trace[candidates[a]])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(candidates[a].cmp(&candidates[b]))
    });

    for &j in &order {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && candidates[j] - candidates[k - 1] < min_spacing {
            k -= 1;
            keep[k] = false;
        }
        let mut k = j;
        while k + 1 < m && candidates[k + 1] - candidates[j] < min_spacing {
            k += 1;
            keep[k] = false;
        }
    }

    candidates
        .iter()
        .zip(&keep)
        .filter_map(|(&idx, &kept)| kept.then_some(idx))
        .collect()
}

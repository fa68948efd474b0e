//! Asymmetric least-squares (AsLS) baseline estimation.
//!
//! Iteratively reweighted penalized least squares following Eilers &
//! Boelens: a smoothness penalty on the discrete second difference keeps
//! the baseline smooth, while asymmetric residual weights keep it under
//! the peaks. Pure function, no side effects.

use super::types::{AnalysisError, AnalysisResult};

/// Estimate a smooth baseline under an asymmetric penalty.
///
/// Solves `(W + lambda * D'D) z = W y` for `niter` reweighting rounds,
/// where `D` is the (n-2) x n second-difference operator. After each
/// solve, samples above the baseline get weight `p` and samples at or
/// below get `1 - p`; with small `p` the baseline tracks the lower
/// envelope. Exactly `niter` rounds are run, with no convergence check.
///
/// # Arguments
/// * `trace` - Input samples, length >= 3
/// * `lambda` - Smoothness parameter (> 0, larger is smoother)
/// * `p` - Asymmetry parameter, strictly between 0 and 1
/// * `niter` - Number of reweighting iterations (>= 1)
///
/// # Returns
/// Baseline of the same length as `trace`.
pub fn estimate_baseline(
    trace: &[f64],
    lambda: f64,
    p: f64,
    niter: usize,
) -> AnalysisResult<Vec<f64>> {
    let n = trace.len();
    if n < 3 {
        return Err(AnalysisError::InvalidInput(format!(
            "Trace length {} is too short for the second-difference operator (need >= 3)",
            n
        )));
    }
    if !(lambda > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Smoothness lambda must be > 0, got {}",
            lambda
        )));
    }
    if !(p > 0.0 && p < 1.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Asymmetry p must be strictly between 0 and 1, got {}",
            p
        )));
    }
    if niter < 1 {
        return Err(AnalysisError::InvalidInput(
            "Iteration count must be >= 1".to_string(),
        ));
    }

    // Bands of lambda * D'D. The Gram matrix of the second-difference
    // operator is pentadiagonal and symmetric.
    let mut penalty_diag = vec![0.0; n];
    let mut penalty_off1 = vec![0.0; n - 1];
    let mut penalty_off2 = vec![0.0; n - 2];
    for j in 0..n - 2 {
        penalty_diag[j] += lambda;
        penalty_diag[j + 1] += 4.0 * lambda;
        penalty_diag[j + 2] += lambda;
        penalty_off1[j] += -2.0 * lambda;
        penalty_off1[j + 1] += -2.0 * lambda;
        penalty_off2[j] += lambda;
    }

    let mut weights = vec![1.0; n];
    let mut baseline = vec![0.0; n];

    for _ in 0..niter {
        // A = W + lambda * D'D, stored as three bands.
        let mut diag = penalty_diag.clone();
        for i in 0..n {
            diag[i] += weights[i];
        }
        let rhs: Vec<f64> = trace.iter().zip(&weights).map(|(y, w)| w * y).collect();

        baseline = solve_banded_spd(&diag, &penalty_off1, &penalty_off2, &rhs)?;

        // Points above the baseline are down-weighted.
        for i in 0..n {
            weights[i] = if trace[i] > baseline[i] { p } else { 1.0 - p };
        }
    }

    Ok(baseline)
}

/// Solve a symmetric positive definite pentadiagonal system via LDL'.
///
/// `diag`, `off1`, `off2` are the main, first, and second lower bands.
fn solve_banded_spd(
    diag: &[f64],
    off1: &[f64],
    off2: &[f64],
    rhs: &[f64],
) -> AnalysisResult<Vec<f64>> {
    let n = diag.len();
    let mut d = vec![0.0; n];
    let mut l1 = vec![0.0; n.saturating_sub(1)];
    let mut l2 = vec![0.0; n.saturating_sub(2)];

    for i in 0..n {
        let mut di = diag[i];
        if i >= 1 {
            di -= l1[i - 1] * l1[i - 1] * d[i - 1];
        }
        if i >= 2 {
            di -= l2[i - 2] * l2[i - 2] * d[i - 2];
        }
        if !(di > 0.0) || !di.is_finite() {
            return Err(AnalysisError::NumericalDegeneracy(format!(
                "Non-positive pivot {} at row {} in baseline solve",
                di, i
            )));
        }
        d[i] = di;

        if i + 1 < n {
            let mut a = off1[i];
            if i >= 1 {
                a -= l2[i - 1] * l1[i - 1] * d[i - 1];
            }
            l1[i] = a / di;
        }
        if i + 2 < n {
            l2[i] = off2[i] / di;
        }
    }

    // Forward substitution: L z = rhs.
    let mut z = rhs.to_vec();
    for i in 0..n {
        if i >= 1 {
            z[i] -= l1[i - 1] * z[i - 1];
        }
        if i >= 2 {
            z[i] -= l2[i - 2] * z[i - 2];
        }
    }
    for i in 0..n {
        z[i] /= d[i];
    }
    // Back substitution: L' x = z.
    for i in (0..n).rev() {
        if i + 1 < n {
            z[i] -= l1[i] * z[i + 1];
        }
        if i + 2 < n {
            z[i] -= l2[i] * z[i + 2];
        }
    }

    Ok(z)
}

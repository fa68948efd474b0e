//! Cross-correlation phase-lag estimation.
//!
//! FFT-based cross-correlation cropped to a centered, same-length output,
//! with the lag of maximum correlation reported as the phase lag between
//! two traces. Pure function, no side effects beyond tracing events.

use rustfft::{num_complex::Complex, FftPlanner};

use super::types::{AnalysisError, AnalysisResult, PhaseLagResult};

/// Compute the phase lag between two traces of equal length.
///
/// The correlation is evaluated at every lag of a centered same-length
/// window; the lag axis assigns lag zero to the bin where a trace's
/// correlation with itself peaks, so `cross_correlate(x, x, dt)` always
/// reports zero.
///
/// Sign convention: positive lag means the second trace leads the first;
/// a copy of the first trace delayed by `k` samples yields `-k * dt`.
///
/// The returned correlation curve is rescaled to [-1, 1] for
/// presentation. The rescale is cosmetic and never influences the lag;
/// when the correlation is constant across all lags the rescale is
/// skipped (`rescaled = false`) instead of dividing by zero.
pub fn cross_correlate(a: &[f64], b: &[f64], dt: f64) -> AnalysisResult<PhaseLagResult> {
    let n = a.len();
    if b.len() != n {
        return Err(AnalysisError::InvalidInput(format!(
            "Trace lengths differ: {} vs {}",
            n,
            b.len()
        )));
    }
    if n < 3 {
        return Err(AnalysisError::InvalidInput(format!(
            "Trace length {} is too short (need >= 3)",
            n
        )));
    }
    if !(dt > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Sampling interval must be > 0, got {}",
            dt
        )));
    }

    let full = fft_cross_correlation(a, b);
    let fft_len = full.len();

    // Centered same-length window: position j carries lag j - n/2.
    let half = (n / 2) as isize;
    let mut correlation = Vec::with_capacity(n);
    for j in 0..n {
        let lag = j as isize - half;
        let idx = if lag >= 0 {
            lag as usize
        } else {
            fft_len - lag.unsigned_abs()
        };
        correlation.push(full[idx]);
    }

    // Argmax with leftmost tie-break.
    let mut peak_idx = 0;
    for (j, &v) in correlation.iter().enumerate() {
        if v > correlation[peak_idx] {
            peak_idx = j;
        }
    }
    let lag_samples = peak_idx as isize - half;
    let peak_value = correlation[peak_idx];

    // Presentation rescale to [-1, 1]; skipped for a flat curve.
    let min = correlation.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = correlation.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let rescaled = span > 0.0 && span.is_finite();
    if rescaled {
        for v in &mut correlation {
            *v = 2.0 * (*v - min) / span - 1.0;
        }
    } else {
        tracing::warn!(
            "Correlation constant across all lags; skipping presentation rescale"
        );
    }

    Ok(PhaseLagResult {
        lag_samples,
        lag_seconds: lag_samples as f64 * dt,
        peak_value,
        correlation,
        rescaled,
    })
}

/// Full linear cross-correlation via the convolution theorem:
/// `corr(a, b) = IFFT(FFT(a) * conj(FFT(b)))`, zero-padded so circular
/// wrap-around cannot alias. Index `m` holds the lag-`m` value with
/// negative lags wrapped to the tail.
fn fft_cross_correlation(a: &[f64], b: &[f64]) -> Vec<f64> {
    let fft_len = (a.len() + b.len() - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut a_complex: Vec<Complex<f64>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    a_complex.resize(fft_len, Complex::new(0.0, 0.0));
    let mut b_complex: Vec<Complex<f64>> = b.iter().map(|&x| Complex::new(x, 0.0)).collect();
    b_complex.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut a_complex);
    fft.process(&mut b_complex);

    let mut product: Vec<Complex<f64>> = a_complex
        .iter()
        .zip(b_complex.iter())
        .map(|(x, y)| x * y.conj())
        .collect();

    ifft.process(&mut product);

    let scale = 1.0 / fft_len as f64;
    product.iter().map(|c| c.re * scale).collect()
}

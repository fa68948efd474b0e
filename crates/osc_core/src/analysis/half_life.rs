//! Autocorrelation-envelope half-life estimation.
//!
//! The half-life is the lag at which the absolute value of the trace's
//! normalized autocorrelation first decays to half its zero-lag value,
//! refined to sub-sample resolution by linear interpolation.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use super::types::{AnalysisError, AnalysisResult, HalfLifeResult};

/// Compute the autocorrelation half-life of a trace.
///
/// The trace is mean-centered and autocorrelated; non-negative lags are
/// normalized by the zero-lag value and their absolute value taken as an
/// envelope (the zero-lag envelope sample is 1.0 by definition). The
/// sampling interval is the median of consecutive time differences,
/// which tolerates occasional irregular spacing. The first envelope
/// sample at or below 0.5 brackets the crossing; `value` is `None` when
/// no crossing is observed within the trace length.
pub fn half_life(times: &[f64], trace: &[f64]) -> AnalysisResult<HalfLifeResult> {
    let n = trace.len();
    if times.len() != n {
        return Err(AnalysisError::InvalidInput(format!(
            "Time axis length {} does not match trace length {}",
            times.len(),
            n
        )));
    }
    if n < 3 {
        return Err(AnalysisError::InvalidInput(format!(
            "Trace length {} is too short (need >= 3)",
            n
        )));
    }

    let dt = median_interval(times)?;

    let mean = trace.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = trace.iter().map(|&y| y - mean).collect();

    let acf = autocorrelation(&centered);
    let zero_lag = acf[0];
    if zero_lag == 0.0 {
        return Err(AnalysisError::NumericalDegeneracy(
            "Zero-lag autocorrelation is zero (constant trace)".to_string(),
        ));
    }

    let mut envelope: Vec<f64> = acf.iter().map(|&v| (v / zero_lag).abs()).collect();
    envelope[0] = 1.0;

    let crossing = envelope.iter().position(|&v| v <= 0.5);
    let value = match crossing {
        None => None,
        Some(0) => Some(0.0),
        Some(k) => {
            // Linear interpolation between the bracketing lag samples.
            let t0 = (k - 1) as f64 * dt;
            let t1 = k as f64 * dt;
            let e0 = envelope[k - 1];
            let e1 = envelope[k];
            Some(t0 + (0.5 - e0) * (t1 - t0) / (e1 - e0))
        }
    };

    Ok(HalfLifeResult {
        value,
        sample_interval: dt,
    })
}

/// Per-trace half-lives over a population of traces sharing a time axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationHalfLife {
    /// Half-lives of the traces that produced a crossing.
    pub values: Vec<f64>,
    /// Number of traces with a valid half-life.
    pub n_valid: usize,
    /// Mean of the valid half-lives.
    pub mean: f64,
    /// Standard error of the mean (sample standard deviation, ddof = 1).
    /// Zero when fewer than two valid values exist.
    pub sem: f64,
}

/// Compute half-lives across a population of traces and summarize them.
///
/// Traces without a crossing, and traces that are individually degenerate
/// (constant), are dropped from the summary. `InvalidInput` if no trace
/// yields a valid estimate.
pub fn population_half_life(
    times: &[f64],
    traces: &[Vec<f64>],
) -> AnalysisResult<PopulationHalfLife> {
    if traces.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Population is empty".to_string(),
        ));
    }

    let mut values = Vec::new();
    for (i, trace) in traces.iter().enumerate() {
        match half_life(times, trace) {
            Ok(result) => {
                if let Some(v) = result.value {
                    values.push(v);
                }
            }
            Err(AnalysisError::NumericalDegeneracy(reason)) => {
                tracing::warn!("Trace {} dropped from population: {}", i, reason);
            }
            Err(e) => return Err(e),
        }
    }

    let n_valid = values.len();
    if n_valid == 0 {
        return Err(AnalysisError::InvalidInput(
            "No valid half-life estimates in population".to_string(),
        ));
    }

    let mean = values.iter().sum::<f64>() / n_valid as f64;
    let sem = if n_valid >= 2 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n_valid - 1) as f64;
        var.sqrt() / (n_valid as f64).sqrt()
    } else {
        0.0
    };

    Ok(PopulationHalfLife {
        values,
        n_valid,
        mean,
        sem,
    })
}

/// Median of consecutive time differences.
fn median_interval(times: &[f64]) -> AnalysisResult<f64> {
    let mut diffs: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    diffs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let m = diffs.len();
    let median = if m % 2 == 1 {
        diffs[m / 2]
    } else {
        (diffs[m / 2 - 1] + diffs[m / 2]) / 2.0
    };

    if !(median > 0.0) || !median.is_finite() {
        return Err(AnalysisError::InvalidInput(format!(
            "Median sampling interval must be > 0, got {}",
            median
        )));
    }
    Ok(median)
}

/// Non-negative-lag autocorrelation via FFT.
fn autocorrelation(centered: &[f64]) -> Vec<f64> {
    let n = centered.len();
    let fft_len = (2 * n - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut buffer: Vec<Complex<f64>> = centered.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut buffer);
    for c in &mut buffer {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    ifft.process(&mut buffer);

    let scale = 1.0 / fft_len as f64;
    buffer[..n].iter().map(|c| c.re * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn exponential_decay_half_life_near_tau_ln2() {
        // y = exp(-t/50) over t = 0..500: expected ~50 * ln 2 = 34.66,
        // shifted slightly by mean-centering of the finite window.
        let times: Vec<f64> = (0..=500).map(|i| i as f64).collect();
        let trace: Vec<f64> = times.iter().map(|&t| (-t / 50.0).exp()).collect();

        let result = half_life(&times, &trace).unwrap();
        let value = result.value.expect("expected a crossing");
        assert!(
            (value - 50.0 * 2.0_f64.ln()).abs() < 2.0,
            "Expected ~34.7, got {}",
            value
        );
        assert_eq!(result.sample_interval, 1.0);
    }

    #[test]
    fn sinusoid_crossing_is_sub_sample() {
        // |cos(2 pi k / 20)| first reaches 0.5 at k = 20/6 = 3.33; the
        // interpolated crossing should land between samples 3 and 4.
        let times: Vec<f64> = (0..2000).map(|i| i as f64).collect();
        let trace: Vec<f64> = times.iter().map(|&t| (2.0 * PI * t / 20.0).sin()).collect();

        let value = half_life(&times, &trace).unwrap().value.unwrap();
        assert!(
            (value - 20.0 / 6.0).abs() < 0.2,
            "Expected ~3.33, got {}",
            value
        );
        assert!(value > 3.0 && value < 4.0, "Expected sub-sample crossing");
    }

    #[test]
    fn constant_trace_is_degenerate() {
        let times: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let trace = vec![7.0; 100];
        let err = half_life(&times, &trace).unwrap_err();
        assert!(matches!(err, AnalysisError::NumericalDegeneracy(_)));
    }

    #[test]
    fn irregular_time_axis_uses_median_interval() {
        // One glitched gap should not move the estimated interval.
        let mut times: Vec<f64> = (0..200).map(|i| i as f64 * 0.5).collect();
        times[150] += 5.0; // single irregular jump
        let trace: Vec<f64> = (0..200).map(|i| (-(i as f64) * 0.5 / 10.0).exp()).collect();

        let result = half_life(&times, &trace).unwrap();
        assert_eq!(result.sample_interval, 0.5);
    }

    #[test]
    fn rejects_non_increasing_time_axis() {
        let times = vec![0.0, 1.0, 1.0, 1.0, 1.0];
        let trace = vec![1.0, 0.5, 0.25, 0.125, 0.0625];
        assert!(half_life(&times, &trace).is_err());
    }

    #[test]
    fn rejects_length_mismatch_and_short_traces() {
        let times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let trace = vec![1.0; 9];
        assert!(half_life(&times, &trace).is_err());
        assert!(half_life(&times[..2], &trace[..2]).is_err());
    }

    #[test]
    fn population_summarizes_valid_traces() {
        let times: Vec<f64> = (0..=500).map(|i| i as f64).collect();
        let traces: Vec<Vec<f64>> = [40.0, 50.0, 60.0]
            .iter()
            .map(|&tau| times.iter().map(|&t| (-t / tau).exp()).collect())
            .collect();

        let pop = population_half_life(&times, &traces).unwrap();
        assert_eq!(pop.n_valid, 3);
        assert!(
            (pop.mean - 50.0 * 2.0_f64.ln()).abs() < 3.0,
            "Expected mean near 34.7, got {}",
            pop.mean
        );
        assert!(pop.sem > 0.0);
    }

    #[test]
    fn population_drops_degenerate_traces() {
        let times: Vec<f64> = (0..=500).map(|i| i as f64).collect();
        let decay: Vec<f64> = times.iter().map(|&t| (-t / 50.0).exp()).collect();
        let flat = vec![1.0; times.len()];

        let pop = population_half_life(&times, &[decay, flat]).unwrap();
        assert_eq!(pop.n_valid, 1);
        assert_eq!(pop.sem, 0.0);
    }

    #[test]
    fn population_with_no_valid_traces_is_an_error() {
        let times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let flat = vec![2.0; 10];
        assert!(population_half_life(&times, &[flat]).is_err());
    }
}

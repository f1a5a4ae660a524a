// CycleScope - core/hp_filter.rs
//
// Hodrick-Prescott trend/cycle decomposition.
//
// The trend τ minimises
//
//     Σ (y_t − τ_t)²  +  λ Σ (τ_{t+1} − 2τ_t + τ_{t−1})²
//
// whose normal equations are (I + λ KᵀK) τ = y, with K the (n−2)×n
// second-difference operator. The matrix is symmetric positive definite and
// pentadiagonal, so a banded LDLᵀ factorisation solves it in O(n).
// Core layer: pure numeric code, no I/O.

use crate::core::model::{Decomposition, TimeSeries};
use crate::util::constants;
use crate::util::error::AnalysisError;

/// Second-difference stencil (one row of K).
const STENCIL: [f64; 3] = [1.0, -2.0, 1.0];

/// Split `series` into trend and cycle with smoothing parameter `lambda`.
///
/// `series` should already be log-transformed and free of missing values
/// (see [`crate::core::align::align`]).
pub fn decompose(series: &TimeSeries, lambda: f64) -> Result<Decomposition, AnalysisError> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(AnalysisError::InvalidLambda { value: lambda });
    }

    let n = series.len();
    if n < constants::MIN_HP_OBSERVATIONS {
        return Err(AnalysisError::InsufficientData {
            required: constants::MIN_HP_OBSERVATIONS,
            actual: n,
        });
    }

    let y: Vec<f64> = series.present_values();
    if y.len() != n {
        // Gaps would silently shift the penalty onto the wrong neighbours.
        return Err(AnalysisError::DataUnavailable {
            start: series.first_date().unwrap_or_default(),
            end: series.last_date().unwrap_or_default(),
        });
    }

    let trend = hp_trend(&y, lambda)?;
    let cycle: Vec<f64> = y.iter().zip(&trend).map(|(obs, t)| obs - t).collect();

    tracing::trace!(n, lambda, "HP decomposition complete");

    Ok(Decomposition {
        lambda,
        trend: series.with_values(trend),
        cycle: series.with_values(cycle),
    })
}

/// HP trend of a raw slice. Below three points the penalty is empty and
/// the trend equals `y`.
pub fn hp_trend(y: &[f64], lambda: f64) -> Result<Vec<f64>, AnalysisError> {
    let (diag, off1, off2) = system_bands(y.len(), lambda);
    solve_pentadiagonal(diag, off1, off2, y)
}

/// Bands of the symmetric matrix I + λ KᵀK.
///
/// Returns the main diagonal (length n), first super-diagonal (n−1) and
/// second super-diagonal (n−2). Built by accumulating the outer product of
/// each stencil row, which gets the boundary rows right without special cases.
fn system_bands(n: usize, lambda: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut diag = vec![1.0; n];
    let mut off1 = vec![0.0; n.saturating_sub(1)];
    let mut off2 = vec![0.0; n.saturating_sub(2)];

    for row in 0..n.saturating_sub(2) {
        for a in 0..3 {
            for b in a..3 {
                let v = lambda * STENCIL[a] * STENCIL[b];
                match b - a {
                    0 => diag[row + a] += v,
                    1 => off1[row + a] += v,
                    _ => off2[row + a] += v,
                }
            }
        }
    }

    (diag, off1, off2)
}

/// Solve A x = rhs for symmetric pentadiagonal A via LDLᵀ.
///
/// `l1[i]` = L[i+1][i], `l2[i]` = L[i+2][i]; both overwrite the input bands.
fn solve_pentadiagonal(
    diag: Vec<f64>,
    mut l1: Vec<f64>,
    mut l2: Vec<f64>,
    rhs: &[f64],
) -> Result<Vec<f64>, AnalysisError> {
    let n = diag.len();
    let mut d = vec![0.0; n];

    for i in 0..n {
        let mut pivot = diag[i];
        if i >= 1 {
            pivot -= l1[i - 1] * l1[i - 1] * d[i - 1];
        }
        if i >= 2 {
            pivot -= l2[i - 2] * l2[i - 2] * d[i - 2];
        }
        if !pivot.is_finite() || pivot <= 0.0 {
            return Err(AnalysisError::NumericalBreakdown { index: i });
        }
        d[i] = pivot;

        if i + 1 < n {
            let mut a = l1[i];
            if i >= 1 {
                a -= l2[i - 1] * l1[i - 1] * d[i - 1];
            }
            l1[i] = a / pivot;
        }
        if i + 2 < n {
            l2[i] /= pivot;
        }
    }

    // Forward substitution: L z = rhs.
    let mut x = rhs.to_vec();
    for i in 0..n {
        if i >= 1 {
            x[i] -= l1[i - 1] * x[i - 1];
        }
        if i >= 2 {
            x[i] -= l2[i - 2] * x[i - 2];
        }
    }

    // D w = z.
    for (xi, di) in x.iter_mut().zip(&d) {
        *xi /= di;
    }

    // Back substitution: Lᵀ x = w.
    for i in (0..n).rev() {
        if i + 1 < n {
            x[i] -= l1[i] * x[i + 1];
        }
        if i + 2 < n {
            x[i] -= l2[i] * x[i + 2];
        }
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NumericalBreakdown { index: n });
    }

    Ok(x)
}

/// Sum of squared second differences, the HP roughness penalty.
pub fn roughness(values: &[f64]) -> f64 {
    values
        .windows(3)
        .map(|w| {
            let dd = w[2] - 2.0 * w[1] + w[0];
            dd * dd
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Frequency, Observation};
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
    }

    fn series(values: &[f64]) -> TimeSeries {
        TimeSeries::from_values(Frequency::Quarterly, start(), values).unwrap()
    }

    /// Deterministic pseudo-noise so tests do not need an RNG crate.
    fn wiggly(n: usize) -> Vec<f64> {
        (0..n)
            .map(|t| {
                let t = t as f64;
                4.6 + 0.006 * t + 0.03 * (t * 0.7).sin() + 0.01 * (t * 2.3).cos()
            })
            .collect()
    }

    /// Dense reference: build I + λKᵀK explicitly and check A·trend == y.
    fn residual_norm(y: &[f64], trend: &[f64], lambda: f64) -> f64 {
        let n = y.len();
        let mut a = vec![vec![0.0; n]; n];
        for (i, row) in a.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        for r in 0..n - 2 {
            for i in 0..3 {
                for j in 0..3 {
                    a[r + i][r + j] += lambda * STENCIL[i] * STENCIL[j];
                }
            }
        }
        (0..n)
            .map(|i| {
                let ax: f64 = (0..n).map(|j| a[i][j] * trend[j]).sum();
                (ax - y[i]).abs()
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_solution_satisfies_normal_equations() {
        for n in [4, 5, 6, 12, 40] {
            let y = wiggly(n);
            let trend = hp_trend(&y, 1600.0).unwrap();
            assert!(
                residual_norm(&y, &trend, 1600.0) < 1e-6,
                "normal equations not satisfied for n = {n}"
            );
        }
    }

    #[test]
    fn test_trend_plus_cycle_equals_input() {
        let y = wiggly(60);
        let s = series(&y);
        let d = decompose(&s, 1600.0).unwrap();
        assert_eq!(d.trend.len(), 60);
        assert_eq!(d.cycle.len(), 60);
        for ((obs, t), c) in y
            .iter()
            .zip(d.trend.present_values())
            .zip(d.cycle.present_values())
        {
            assert!(((t + c) - obs).abs() <= 1e-9 * obs.abs().max(1.0));
        }
        let trend_dates: Vec<_> = d.trend.dates().collect();
        let input_dates: Vec<_> = s.dates().collect();
        assert_eq!(trend_dates, input_dates);
    }

    #[test]
    fn test_linear_series_is_pure_trend() {
        let y: Vec<f64> = (0..30).map(|t| 2.0 + 0.01 * t as f64).collect();
        let d = decompose(&series(&y), 1600.0).unwrap();
        for c in d.cycle.present_values() {
            assert!(c.abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_lambda_returns_input_as_trend() {
        let y = wiggly(10);
        let trend = hp_trend(&y, 0.0).unwrap();
        for (a, b) in trend.iter().zip(&y) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_larger_lambda_gives_smoother_trend() {
        let y = wiggly(80);
        let mut previous = f64::INFINITY;
        for lambda in [10.0, 100.0, 1600.0, 14_400.0, 1.0e6] {
            let r = roughness(&hp_trend(&y, lambda).unwrap());
            assert!(r < previous, "roughness did not decrease at lambda = {lambda}");
            previous = r;
        }
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let err = decompose(&series(&[1.0, 2.0, 3.0]), 1600.0).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                required: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_invalid_lambda() {
        let s = series(&wiggly(8));
        assert!(matches!(
            decompose(&s, -1.0),
            Err(AnalysisError::InvalidLambda { .. })
        ));
        assert!(matches!(
            decompose(&s, f64::NAN),
            Err(AnalysisError::InvalidLambda { .. })
        ));
    }

    #[test]
    fn test_missing_values_are_rejected() {
        let mut d = start();
        let mut obs = Vec::new();
        for i in 0..6 {
            obs.push(if i == 3 {
                Observation::missing(d)
            } else {
                Observation::new(d, 1.0 + i as f64)
            });
            d = Frequency::Quarterly.step(d);
        }
        let s = TimeSeries::new(Frequency::Quarterly, obs).unwrap();
        assert!(matches!(
            decompose(&s, 1600.0),
            Err(AnalysisError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_recovers_injected_cycle_and_slope() {
        // 40 quarters: linear trend plus a 4-period cycle of amplitude 0.02.
        let slope = 0.005;
        let amplitude = 0.02;
        let y: Vec<f64> = (0..40)
            .map(|t| {
                let t = t as f64;
                11.0 + slope * t + amplitude * (std::f64::consts::FRAC_PI_2 * t).sin()
            })
            .collect();
        let d = decompose(&series(&y), 1600.0).unwrap();

        // A sampled sinusoid over whole periods has RMS = amplitude / √2.
        let cycle = d.cycle.present_values();
        let rms = (cycle.iter().map(|c| c * c).sum::<f64>() / cycle.len() as f64).sqrt();
        let recovered_amplitude = rms * std::f64::consts::SQRT_2;
        assert!(
            (recovered_amplitude - amplitude).abs() / amplitude < 0.10,
            "amplitude {recovered_amplitude}"
        );

        // OLS slope of the trend against the time index.
        let trend = d.trend.present_values();
        let n = trend.len() as f64;
        let t_mean = (n - 1.0) / 2.0;
        let y_mean = trend.iter().sum::<f64>() / n;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (t, v) in trend.iter().enumerate() {
            let dt = t as f64 - t_mean;
            sxy += dt * (v - y_mean);
            sxx += dt * dt;
        }
        let recovered_slope = sxy / sxx;
        assert!(
            (recovered_slope - slope).abs() / slope < 0.05,
            "slope {recovered_slope}"
        );
    }
}

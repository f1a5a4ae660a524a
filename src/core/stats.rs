// CycleScope - core/stats.rs
//
// Business-cycle statistics over cycle components: volatility (percent
// standard deviation), persistence (lag-1 autocorrelation) and co-movement
// (Pearson correlation with a reference cycle).
//
// Every statistic refuses to answer when it is mathematically undefined
// (fewer than two usable points, or zero variance) instead of returning 0.
// Core layer: pure logic, no I/O.

use crate::core::model::{CountryStatistics, TimeSeries, VariableStatistics};
use crate::util::constants;
use crate::util::error::AnalysisError;

/// Statistic names used in `UndefinedStatistic` errors.
pub const STAT_STD_DEV: &str = "standard deviation";
pub const STAT_AUTOCORRELATION: &str = "lag-1 autocorrelation";
pub const STAT_CORRELATION: &str = "correlation with reference";
pub const STAT_CROSS_CORRELATION: &str = "cross-country correlation";

/// A variable whose statistics could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableFailure {
    pub variable: String,
    pub error: AnalysisError,
}

/// Output of [`compute_statistics`]: successes in input order plus the
/// variables that were left out and why.
#[derive(Debug, Clone, Default)]
pub struct StatisticsReport {
    pub statistics: CountryStatistics,
    pub failures: Vec<VariableFailure>,
}

/// Compute statistics for every cycle series of one country.
///
/// `cycles` maps variable name to cycle series; `reference` names the
/// variable every other cycle is correlated with. A failure for one variable
/// never prevents the others.
pub fn compute_statistics(
    country: &str,
    cycles: &[(String, TimeSeries)],
    reference: &str,
) -> StatisticsReport {
    let mut report = StatisticsReport {
        statistics: CountryStatistics::new(country),
        failures: Vec::new(),
    };

    let reference_cycle = cycles
        .iter()
        .find(|(name, _)| name == reference)
        .map(|(_, series)| series);

    for (variable, cycle) in cycles {
        let result = match reference_cycle {
            Some(reference_cycle) => variable_statistics(variable, cycle, reference_cycle),
            None => Err(AnalysisError::MissingReference {
                reference: reference.to_string(),
            }),
        };

        match result {
            Ok(stats) => {
                tracing::debug!(
                    country,
                    variable = %variable,
                    std_dev = stats.std_dev,
                    persistence = stats.autocorrelation_lag1,
                    corr = stats.corr_with_reference,
                    "Cycle statistics computed"
                );
                report.statistics.variables.push(stats);
            }
            Err(error) => {
                tracing::warn!(country, variable = %variable, error = %error, "Statistics undefined");
                report.failures.push(VariableFailure {
                    variable: variable.clone(),
                    error,
                });
            }
        }
    }

    report
}

/// All three statistics for one cycle series.
pub fn variable_statistics(
    variable: &str,
    cycle: &TimeSeries,
    reference_cycle: &TimeSeries,
) -> Result<VariableStatistics, AnalysisError> {
    let values = cycle.present_values();
    let std_dev = sample_std_dev(&values)? * constants::PERCENT_SCALE;
    let autocorrelation_lag1 = lag1_autocorrelation(cycle)?;
    let corr_with_reference = named_pearson(STAT_CORRELATION, &inner_join(cycle, reference_cycle))?;

    Ok(VariableStatistics {
        variable: variable.to_string(),
        std_dev,
        autocorrelation_lag1,
        corr_with_reference,
        observations: values.len(),
    })
}

/// Sample standard deviation (n − 1 denominator).
pub fn sample_std_dev(values: &[f64]) -> Result<f64, AnalysisError> {
    let n = values.len();
    if n < constants::MIN_STATISTIC_OBSERVATIONS {
        return Err(AnalysisError::UndefinedStatistic {
            statistic: STAT_STD_DEV,
            overlapping: n,
        });
    }
    let mean = mean(values);
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Ok((ss / (n - 1) as f64).sqrt())
}

/// Pearson correlation of paired observations.
pub fn pearson(pairs: &[(f64, f64)]) -> Result<f64, AnalysisError> {
    named_pearson(STAT_CORRELATION, pairs)
}

/// Correlation of the series with itself one period later.
///
/// Pairs are `(date, date + one period)` where both values are usable, so
/// interior gaps never pair observations that are two periods apart.
pub fn lag1_autocorrelation(series: &TimeSeries) -> Result<f64, AnalysisError> {
    let frequency = series.frequency();
    let pairs: Vec<(f64, f64)> = series
        .present()
        .filter_map(|(date, value)| {
            series
                .value_at(frequency.step(date))
                .map(|next| (value, next))
        })
        .collect();
    named_pearson(STAT_AUTOCORRELATION, &pairs)
}

/// Correlation of two countries' cycles for the same variable, over the
/// dates both observe.
pub fn cross_country_correlation(
    left: &TimeSeries,
    right: &TimeSeries,
) -> Result<f64, AnalysisError> {
    named_pearson(STAT_CROSS_CORRELATION, &inner_join(left, right))
}

/// Inner join of two series on their dates, keeping only dates where both
/// have a usable value.
pub fn inner_join(a: &TimeSeries, b: &TimeSeries) -> Vec<(f64, f64)> {
    let mut left = a.present().peekable();
    let mut right = b.present().peekable();
    let mut pairs = Vec::new();

    while let (Some(&(da, va)), Some(&(db, vb))) = (left.peek(), right.peek()) {
        match da.cmp(&db) {
            std::cmp::Ordering::Less => {
                left.next();
            }
            std::cmp::Ordering::Greater => {
                right.next();
            }
            std::cmp::Ordering::Equal => {
                pairs.push((va, vb));
                left.next();
                right.next();
            }
        }
    }

    pairs
}

fn named_pearson(statistic: &'static str, pairs: &[(f64, f64)]) -> Result<f64, AnalysisError> {
    let n = pairs.len();
    let undefined = AnalysisError::UndefinedStatistic {
        statistic,
        overlapping: n,
    };
    if n < constants::MIN_STATISTIC_OBSERVATIONS {
        return Err(undefined);
    }

    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= constants::VARIANCE_EPSILON || syy <= constants::VARIANCE_EPSILON {
        return Err(undefined);
    }

    Ok((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Frequency, Observation};
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
    }

    fn quarterly_from(start: NaiveDate, values: &[f64]) -> TimeSeries {
        TimeSeries::from_values(Frequency::Quarterly, start, values).unwrap()
    }

    fn quarterly(values: &[f64]) -> TimeSeries {
        quarterly_from(start(), values)
    }

    fn sinusoid(n: usize, period: f64, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|t| amplitude * (2.0 * std::f64::consts::PI * t as f64 / period).sin())
            .collect()
    }

    #[test]
    fn test_sample_std_dev_known_values() {
        // Sample variance of 2,4,4,4,5,5,7,9 is 32/7.
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_invariant_to_additive_shift() {
        let base = sinusoid(40, 10.0, 0.03);
        let shifted: Vec<f64> = base.iter().map(|v| v + 7.5).collect();
        let a = sample_std_dev(&base).unwrap();
        let b = sample_std_dev(&shifted).unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_undefined_for_single_value() {
        assert_eq!(
            sample_std_dev(&[1.0]),
            Err(AnalysisError::UndefinedStatistic {
                statistic: STAT_STD_DEV,
                overlapping: 1
            })
        );
    }

    #[test]
    fn test_autocorrelation_of_sinusoid_matches_cosine() {
        let period = 8.0;
        let s = quarterly(&sinusoid(400, period, 0.02));
        let rho = lag1_autocorrelation(&s).unwrap();
        let expected = (2.0 * std::f64::consts::PI / period).cos();
        assert!((rho - expected).abs() < 0.01, "rho = {rho}, expected {expected}");
    }

    #[test]
    fn test_autocorrelation_skips_pairs_across_gaps() {
        // 1, 2, _, 4, 5: only (1,2) and (4,5) are one period apart.
        let mut d = start();
        let mut obs = Vec::new();
        for v in [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)] {
            obs.push(Observation { date: d, value: v });
            d = Frequency::Quarterly.step(d);
        }
        let s = TimeSeries::new(Frequency::Quarterly, obs).unwrap();
        // Pairs (1,2), (4,5): perfectly correlated.
        assert!((lag1_autocorrelation(&s).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_autocorrelation_undefined_for_too_few_pairs() {
        let s = quarterly(&[0.5, 0.7]);
        assert!(matches!(
            lag1_autocorrelation(&s),
            Err(AnalysisError::UndefinedStatistic {
                statistic: STAT_AUTOCORRELATION,
                overlapping: 1
            })
        ));
    }

    #[test]
    fn test_inner_join_keeps_shared_dates_only() {
        let a = quarterly(&[1.0, 2.0, 3.0, 4.0]);
        let later = NaiveDate::from_ymd_opt(2000, 7, 1).unwrap();
        let b = quarterly_from(later, &[30.0, 40.0, 50.0]);
        assert_eq!(inner_join(&a, &b), vec![(3.0, 30.0), (4.0, 40.0)]);
    }

    #[test]
    fn test_zero_overlap_cross_correlation_is_undefined() {
        let a = quarterly(&sinusoid(12, 6.0, 0.01));
        let far = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let b = quarterly_from(far, &sinusoid(12, 6.0, 0.01));
        let err = variable_statistics("consumption", &a, &b).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UndefinedStatistic {
                statistic: STAT_CORRELATION,
                overlapping: 0
            }
        );
    }

    #[test]
    fn test_cross_country_correlation_needs_shared_dates() {
        let spain = quarterly(&sinusoid(20, 8.0, 0.01));
        let far = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let japan = quarterly_from(far, &sinusoid(20, 8.0, 0.02));
        assert_eq!(
            cross_country_correlation(&spain, &japan),
            Err(AnalysisError::UndefinedStatistic {
                statistic: STAT_CROSS_CORRELATION,
                overlapping: 0
            })
        );
    }

    #[test]
    fn test_cross_country_correlation_on_partial_overlap() {
        // Same cycle, the second series starting four quarters (one full
        // period) later: the overlapping dates line up in phase.
        let a = quarterly(&sinusoid(24, 4.0, 0.01));
        let later = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        let b = quarterly_from(later, &sinusoid(24, 4.0, 0.03));
        assert_eq!(inner_join(&a, &b).len(), 20);
        let rho = cross_country_correlation(&a, &b).unwrap();
        assert!((rho - 1.0).abs() < 1e-9, "rho {rho}");
    }

    #[test]
    fn test_constant_series_correlation_is_undefined() {
        assert!(pearson(&[(1.0, 2.0), (1.0, 3.0), (1.0, 4.0)]).is_err());
    }

    #[test]
    fn test_reference_correlates_perfectly_with_itself() {
        let gdp = quarterly(&sinusoid(40, 12.0, 0.02));
        let investment: Vec<f64> = sinusoid(40, 12.0, 0.02).iter().map(|v| -3.0 * v).collect();
        let cycles = vec![
            ("gdp".to_string(), gdp),
            ("investment".to_string(), quarterly(&investment)),
        ];
        let report = compute_statistics("US", &cycles, "gdp");
        assert!(report.failures.is_empty());

        let gdp_stats = report.statistics.get("gdp").unwrap();
        assert!((gdp_stats.corr_with_reference - 1.0).abs() < 1e-12);
        assert_eq!(gdp_stats.observations, 40);

        let inv = report.statistics.get("investment").unwrap();
        assert!((inv.corr_with_reference + 1.0).abs() < 1e-12);
        assert!((inv.std_dev - 3.0 * gdp_stats.std_dev).abs() < 1e-9);
    }

    #[test]
    fn test_missing_reference_fails_every_variable() {
        let cycles = vec![("consumption".to_string(), quarterly(&sinusoid(20, 8.0, 0.01)))];
        let report = compute_statistics("JP", &cycles, "gdp");
        assert!(report.statistics.variables.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            AnalysisError::MissingReference { .. }
        ));
    }

    #[test]
    fn test_one_failure_does_not_abort_siblings() {
        let cycles = vec![
            ("gdp".to_string(), quarterly(&sinusoid(20, 8.0, 0.01))),
            ("consumption".to_string(), quarterly(&[0.01])),
            ("investment".to_string(), quarterly(&sinusoid(20, 8.0, 0.05))),
        ];
        let report = compute_statistics("ES", &cycles, "gdp");
        let names: Vec<_> = report.statistics.variable_names().collect();
        assert_eq!(names, vec!["gdp", "investment"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].variable, "consumption");
    }
}

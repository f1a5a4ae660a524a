// CycleScope - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants;
use crate::util::error::AnalysisError;
use chrono::{Months, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Frequency
// =============================================================================

/// Sampling frequency of an evenly spaced series.
///
/// Config files carry it as text and go through `FromStr`, so a bad value
/// becomes a validation warning rather than a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    #[default]
    Quarterly,
    Annual,
}

impl Frequency {
    /// Number of calendar months between consecutive observations.
    pub fn months_per_period(&self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::Annual => 12,
        }
    }

    /// The date one period after `date`.
    ///
    /// Saturates at `NaiveDate::MAX`; a series that far out fails the
    /// strictly-increasing check instead of panicking here.
    pub fn step(&self, date: NaiveDate) -> NaiveDate {
        date.checked_add_months(Months::new(self.months_per_period()))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Conventional HP smoothing parameter for this frequency.
    pub fn default_lambda(&self) -> f64 {
        match self {
            Frequency::Monthly => constants::DEFAULT_LAMBDA_MONTHLY,
            Frequency::Quarterly => constants::DEFAULT_LAMBDA_QUARTERLY,
            Frequency::Annual => constants::DEFAULT_LAMBDA_ANNUAL,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Annual => "annual",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "m" => Ok(Frequency::Monthly),
            "quarterly" | "q" => Ok(Frequency::Quarterly),
            "annual" | "yearly" | "a" | "y" => Ok(Frequency::Annual),
            other => Err(format!(
                "unknown frequency '{other}' (expected monthly, quarterly, or annual)"
            )),
        }
    }
}

// =============================================================================
// Date range
// =============================================================================

/// Inclusive calendar window an analysis is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalysisError> {
        if start > end {
            return Err(AnalysisError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// =============================================================================
// Time series
// =============================================================================

/// One dated observation. A missing value is explicit rather than NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }

    pub fn missing(date: NaiveDate) -> Self {
        Self { date, value: None }
    }

    /// The value, if present and finite.
    pub fn usable(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// An ordered, evenly spaced series of observations.
///
/// Invariant: dates are strictly increasing (no duplicates). Enforced by
/// every constructor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    frequency: Frequency,
    observations: Vec<Observation>,
}

impl TimeSeries {
    pub fn new(
        frequency: Frequency,
        observations: Vec<Observation>,
    ) -> Result<Self, AnalysisError> {
        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AnalysisError::NonIncreasingTimestamps {
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }
        Ok(Self {
            frequency,
            observations,
        })
    }

    /// Build a gap-free series starting at `start`, one value per period.
    pub fn from_values(
        frequency: Frequency,
        start: NaiveDate,
        values: &[f64],
    ) -> Result<Self, AnalysisError> {
        let mut date = start;
        let mut observations = Vec::with_capacity(values.len());
        for &value in values {
            observations.push(Observation::new(date, value));
            date = frequency.step(date);
        }
        Self::new(frequency, observations)
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.observations.iter().map(|o| o.date)
    }

    /// Iterate `(date, value)` for observations with a usable value.
    pub fn present(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.observations
            .iter()
            .filter_map(|o| o.usable().map(|v| (o.date, v)))
    }

    pub fn present_values(&self) -> Vec<f64> {
        self.present().map(|(_, v)| v).collect()
    }

    /// Number of observations with no usable value.
    pub fn missing_count(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.usable().is_none())
            .count()
    }

    /// Usable value at exactly `date`, if any.
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.observations
            .binary_search_by(|o| o.date.cmp(&date))
            .ok()
            .and_then(|i| self.observations[i].usable())
    }

    /// Natural logarithm of every present value. Missing values stay missing.
    pub fn ln(&self) -> Result<TimeSeries, AnalysisError> {
        let observations = self
            .observations
            .iter()
            .map(|o| match o.value {
                None => Ok(Observation::missing(o.date)),
                Some(v) if v > 0.0 && v.is_finite() => Ok(Observation::new(o.date, v.ln())),
                Some(v) => Err(AnalysisError::NonPositiveValue {
                    date: o.date,
                    value: v,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            frequency: self.frequency,
            observations,
        })
    }

    /// Same dates, new values. Caller guarantees `values.len() == self.len()`.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> TimeSeries {
        debug_assert_eq!(values.len(), self.observations.len());
        let observations = self
            .observations
            .iter()
            .zip(values)
            .map(|(o, v)| Observation::new(o.date, v))
            .collect();
        Self {
            frequency: self.frequency,
            observations,
        }
    }
}

// =============================================================================
// Decomposition
// =============================================================================

/// Additive trend/cycle split of one (log) series.
///
/// Invariant: `trend` and `cycle` share the input's dates, and
/// `trend[t] + cycle[t] == input[t]` for every t.
#[derive(Debug, Clone, Serialize)]
pub struct Decomposition {
    /// Smoothing parameter the trend was extracted with.
    pub lambda: f64,
    pub trend: TimeSeries,
    pub cycle: TimeSeries,
}

impl Decomposition {
    pub fn len(&self) -> usize {
        self.trend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trend.is_empty()
    }

    /// Iterate `(date, observed, trend, cycle)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, f64, f64, f64)> + '_ {
        self.trend
            .observations()
            .iter()
            .zip(self.cycle.observations())
            .map(|(t, c)| {
                let trend = t.value.unwrap_or(f64::NAN);
                let cycle = c.value.unwrap_or(f64::NAN);
                (t.date, trend + cycle, trend, cycle)
            })
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Business-cycle statistics of one variable's cycle component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableStatistics {
    /// Variable name, e.g. "gdp".
    pub variable: String,

    /// Sample standard deviation of the cycle, in percent.
    pub std_dev: f64,

    /// Lag-1 autocorrelation of the cycle (persistence).
    pub autocorrelation_lag1: f64,

    /// Pearson correlation with the reference variable's cycle.
    pub corr_with_reference: f64,

    /// Number of cycle observations the statistics were computed from.
    pub observations: usize,
}

/// All variable statistics computed for one country, in analysis order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CountryStatistics {
    pub country: String,
    pub variables: Vec<VariableStatistics>,
}

impl CountryStatistics {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            variables: Vec::new(),
        }
    }

    pub fn get(&self, variable: &str) -> Option<&VariableStatistics> {
        self.variables.iter().find(|v| v.variable == variable)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.variable.as_str())
    }
}

/// Statistic kinds reported in a comparison table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
    Volatility,
    Persistence,
    CorrWithReference,
}

impl Metric {
    /// All metrics in table order.
    pub fn all() -> &'static [Metric] {
        &[
            Metric::Volatility,
            Metric::Persistence,
            Metric::CorrWithReference,
        ]
    }

    /// Column heading; the correlation heading names the reference variable.
    pub fn label(&self, reference: &str) -> String {
        match self {
            Metric::Volatility => "Volatility (%)".to_string(),
            Metric::Persistence => "Persistence".to_string(),
            Metric::CorrWithReference => format!("Corr. with {}", reference.to_uppercase()),
        }
    }

    pub fn extract(&self, stats: &VariableStatistics) -> f64 {
        match self {
            Metric::Volatility => stats.std_dev,
            Metric::Persistence => stats.autocorrelation_lag1,
            Metric::CorrWithReference => stats.corr_with_reference,
        }
    }
}

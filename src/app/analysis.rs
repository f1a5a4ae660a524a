// CycleScope - app/analysis.rs
//
// Business-cycle pipeline orchestration.
//
// For each country: fetch every requested variable, align it to the
// analysis window, log-transform, HP-filter, then compute cycle statistics.
// Two countries are compared by one generic routine parameterised by their
// codes.
//
// Failure policy:
//   - Every per-variable failure is recorded as an `Omission` (variable,
//     stage, typed error) and the sibling variables carry on.
//   - Nothing here decides that a run is fatal; callers inspect
//     `CountryAnalysis::has_usable_series` and the omission lists.
//   - Variables are processed in parallel; output order follows the
//     requested variable order.

use crate::app::source::DataSource;
use crate::core::align;
use crate::core::comparison::{self, CoMovementTable, ComparisonTable};
use crate::core::hp_filter;
use crate::core::model::{CountryStatistics, DateRange, Decomposition, Frequency, TimeSeries};
use crate::core::stats;
use crate::platform::config::AppConfig;
use crate::util::error::{AnalysisError, CycleScopeError, SourceError};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::fmt;

// =============================================================================
// Settings
// =============================================================================

/// Explicit per-run parameters passed into every pipeline call.
///
/// The sampling frequency is not part of the settings: each series carries
/// the frequency its source declared, and gap checks, lag pairing and the
/// default λ all follow it.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// HP smoothing parameter. `None` = the series frequency's conventional value.
    pub lambda: Option<f64>,
    /// Analysis window, inclusive.
    pub range: DateRange,
    /// Variable other cycles are correlated with.
    pub reference: String,
    /// Variables to analyse, in output order.
    pub variables: Vec<String>,
}

impl AnalysisSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            lambda: config.lambda_explicit.then_some(config.lambda),
            range: DateRange::new(config.start, config.end)?,
            reference: config.reference.clone(),
            variables: config.variables.clone(),
        })
    }

    /// Smoothing parameter for a series sampled at `frequency`.
    pub fn lambda_for(&self, frequency: Frequency) -> f64 {
        self.lambda.unwrap_or_else(|| frequency.default_lambda())
    }
}

// =============================================================================
// Results
// =============================================================================

/// Pipeline stage at which a variable was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Align,
    Transform,
    Decompose,
    Statistics,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Align => "align",
            Stage::Transform => "log transform",
            Stage::Decompose => "HP filter",
            Stage::Statistics => "statistics",
        }
    }
}

/// A variable left out of the results, with the reason.
#[derive(Debug)]
pub struct Omission {
    pub variable: String,
    pub stage: Stage,
    pub error: CycleScopeError,
}

impl Omission {
    fn new(variable: &str, stage: Stage, error: impl Into<CycleScopeError>) -> Self {
        Self {
            variable: variable.to_string(),
            stage,
            error: error.into(),
        }
    }
}

impl fmt::Display for Omission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' omitted at {} stage: {}",
            self.variable,
            self.stage.label(),
            self.error
        )
    }
}

/// One successfully decomposed variable.
#[derive(Debug, Clone)]
pub struct VariableAnalysis {
    pub variable: String,
    /// Expected periods absent from the aligned series.
    pub missing_periods: Vec<NaiveDate>,
    pub decomposition: Decomposition,
}

/// Everything computed for one country.
#[derive(Debug)]
pub struct CountryAnalysis {
    pub code: String,
    pub name: String,
    pub variables: Vec<VariableAnalysis>,
    pub statistics: CountryStatistics,
    pub omissions: Vec<Omission>,
}

impl CountryAnalysis {
    /// True if at least one variable produced statistics.
    pub fn has_usable_series(&self) -> bool {
        !self.statistics.variables.is_empty()
    }

    /// `(variable, cycle)` pairs in analysis order.
    pub fn cycles(&self) -> Vec<(String, TimeSeries)> {
        self.variables
            .iter()
            .map(|v| (v.variable.clone(), v.decomposition.cycle.clone()))
            .collect()
    }

    pub fn decomposition(&self, variable: &str) -> Option<&Decomposition> {
        self.variables
            .iter()
            .find(|v| v.variable == variable)
            .map(|v| &v.decomposition)
    }
}

/// Result of comparing two countries.
#[derive(Debug)]
pub struct PairComparison {
    pub left: CountryAnalysis,
    pub right: CountryAnalysis,
    /// Within-country statistics side by side.
    pub table: ComparisonTable,
    /// Cross-country volatility and cycle correlation per shared variable.
    pub co_movement: CoMovementTable,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Align, log-transform, and HP-filter one raw series.
///
/// Gap detection and λ follow `raw`'s own frequency.
pub fn decompose_variable(
    variable: &str,
    raw: &TimeSeries,
    settings: &AnalysisSettings,
) -> Result<VariableAnalysis, Omission> {
    let frequency = raw.frequency();
    let lambda = settings.lambda_for(frequency);

    let aligned = align::align(raw, frequency, &settings.range)
        .map_err(|e| Omission::new(variable, Stage::Align, e))?;

    let logged = aligned
        .series
        .ln()
        .map_err(|e| Omission::new(variable, Stage::Transform, e))?;

    let decomposition = hp_filter::decompose(&logged, lambda)
        .map_err(|e| Omission::new(variable, Stage::Decompose, e))?;

    tracing::debug!(
        variable,
        %frequency,
        observations = decomposition.len(),
        gaps = aligned.missing_periods.len(),
        lambda,
        "Variable decomposed"
    );

    Ok(VariableAnalysis {
        variable: variable.to_string(),
        missing_periods: aligned.missing_periods,
        decomposition,
    })
}

/// Run the full pipeline for one country.
///
/// Fails only when the source does not know the country at all; every
/// per-variable problem ends up in `omissions`.
pub fn analyze_country<S: DataSource + ?Sized>(
    source: &S,
    code: &str,
    settings: &AnalysisSettings,
) -> Result<CountryAnalysis, SourceError> {
    let name = source.country_name(code)?;
    tracing::info!(country = %code, name = %name, "Analysing country");

    let outcomes: Vec<Result<VariableAnalysis, Omission>> = settings
        .variables
        .par_iter()
        .map(|variable| {
            let raw = source
                .fetch(code, variable)
                .into_result()
                .map_err(|e| Omission::new(variable, Stage::Fetch, e))?;
            decompose_variable(variable, &raw, settings)
        })
        .collect();

    let mut variables = Vec::new();
    let mut omissions = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(analysis) => variables.push(analysis),
            Err(omission) => {
                tracing::warn!(country = %code, "{}", omission);
                omissions.push(omission);
            }
        }
    }

    let mut analysis = CountryAnalysis {
        code: code.to_uppercase(),
        statistics: CountryStatistics::new(name.as_str()),
        name,
        variables,
        omissions,
    };

    let report = stats::compute_statistics(&analysis.name, &analysis.cycles(), &settings.reference);
    for failure in report.failures {
        analysis.omissions.push(Omission::new(
            &failure.variable,
            Stage::Statistics,
            failure.error,
        ));
    }
    analysis.statistics = report.statistics;

    Ok(analysis)
}

/// Compare two countries' business cycles.
///
/// Table rows follow `settings.variables`, restricted to variables both
/// countries produced statistics for. Comparing a country with itself is
/// rejected, since both columns would carry the same label.
pub fn compare_countries<S: DataSource + ?Sized>(
    source: &S,
    left: &str,
    right: &str,
    settings: &AnalysisSettings,
) -> Result<PairComparison, CycleScopeError> {
    if left.trim().eq_ignore_ascii_case(right.trim()) {
        return Err(AnalysisError::IdenticalCountries {
            code: left.trim().to_uppercase(),
        }
        .into());
    }

    let left = analyze_country(source, left, settings)?;
    let right = analyze_country(source, right, settings)?;

    let table = comparison::build_comparison(
        &left.statistics,
        &right.statistics,
        &settings.variables,
        &settings.reference,
    );
    let co_movement = comparison::build_co_movement(
        &left.name,
        &left.cycles(),
        &right.name,
        &right.cycles(),
        &settings.variables,
    );

    tracing::info!(
        left = %left.name,
        right = %right.name,
        variables = table.variables.len(),
        co_movement = co_movement.rows.len(),
        "Comparison table built"
    );

    Ok(PairComparison {
        left,
        right,
        table,
        co_movement,
    })
}

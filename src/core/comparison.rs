// CycleScope - core/comparison.rs
//
// Two-country comparison table: joins per-country variable statistics on
// shared variable names and lays them out metric-major, country-minor.
// Variables present in only one country are excluded (and listed), not
// padded with placeholders.
//
// Also builds the cross-country co-movement table: for each shared
// variable, both cycles' volatility and the correlation between the two
// countries' cycles on their common dates.
// Core layer: pure logic, no I/O.

use crate::core::model::{CountryStatistics, Metric, TimeSeries};
use crate::core::stats::{self, VariableFailure};
use crate::util::constants;
use crate::util::error::AnalysisError;
use serde::Serialize;
use std::fmt;

/// One (metric, country) column: a value per table variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonColumn {
    pub metric: Metric,
    pub country: String,
    pub values: Vec<f64>,
}

/// Mapping from (metric, country) to per-variable values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    /// Reference variable named in the correlation heading.
    pub reference: String,

    /// Row labels, in output order.
    pub variables: Vec<String>,

    /// Country labels, in column order.
    pub countries: Vec<String>,

    /// Columns in metric-major order.
    pub columns: Vec<ComparisonColumn>,

    /// Requested variables dropped because one side lacks them.
    pub excluded: Vec<String>,
}

impl ComparisonTable {
    pub fn column(&self, metric: Metric, country: &str) -> Option<&ComparisonColumn> {
        self.columns
            .iter()
            .find(|c| c.metric == metric && c.country == country)
    }

    pub fn value(&self, metric: Metric, country: &str, variable: &str) -> Option<f64> {
        let row = self.variables.iter().position(|v| v == variable)?;
        self.column(metric, country).map(|c| c.values[row])
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Variables present in both collections, in `left`'s order.
pub fn shared_variables(left: &CountryStatistics, right: &CountryStatistics) -> Vec<String> {
    left.variable_names()
        .filter(|name| right.contains(name))
        .map(str::to_string)
        .collect()
}

/// Build the comparison table for `variables` (output order follows it).
///
/// A variable missing from either side is excluded from every column.
pub fn build_comparison(
    left: &CountryStatistics,
    right: &CountryStatistics,
    variables: &[String],
    reference: &str,
) -> ComparisonTable {
    let mut kept = Vec::new();
    let mut excluded = Vec::new();
    for variable in variables {
        if kept.contains(variable) || excluded.contains(variable) {
            continue;
        }
        if left.contains(variable) && right.contains(variable) {
            kept.push(variable.clone());
        } else {
            excluded.push(variable.clone());
        }
    }

    if !excluded.is_empty() {
        tracing::info!(
            left = %left.country,
            right = %right.country,
            excluded = ?excluded,
            "Variables not available for both countries were left out of the comparison"
        );
    }

    let mut columns = Vec::with_capacity(Metric::all().len() * 2);
    for metric in Metric::all() {
        for side in [left, right] {
            let values = kept
                .iter()
                .filter_map(|v| side.get(v))
                .map(|stats| metric.extract(stats))
                .collect();
            columns.push(ComparisonColumn {
                metric: *metric,
                country: side.country.clone(),
                values,
            });
        }
    }

    ComparisonTable {
        reference: reference.to_string(),
        variables: kept,
        countries: vec![left.country.clone(), right.country.clone()],
        columns,
        excluded,
    }
}

impl fmt::Display for ComparisonTable {
    /// Fixed-width text rendering, two header rows (metric, country).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimals = constants::TABLE_DECIMALS;
        let row_width = self
            .variables
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8);
        let col_width = self
            .columns
            .iter()
            .map(|c| c.metric.label(&self.reference).len().max(c.country.len()))
            .max()
            .unwrap_or(0)
            .max(decimals + 4);

        write!(f, "{:row_width$}", "")?;
        for column in &self.columns {
            write!(f, "  {:>col_width$}", column.metric.label(&self.reference))?;
        }
        writeln!(f)?;

        write!(f, "{:row_width$}", "")?;
        for column in &self.columns {
            write!(f, "  {:>col_width$}", column.country)?;
        }
        writeln!(f)?;

        for (row, variable) in self.variables.iter().enumerate() {
            write!(f, "{variable:<row_width$}")?;
            for column in &self.columns {
                write!(f, "  {:>col_width$.decimals$}", column.values[row])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// =============================================================================
// Cross-country co-movement
// =============================================================================

/// Co-movement of one variable's cycle across the two countries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoMovement {
    pub variable: String,
    /// Left country's cycle standard deviation, in percent.
    pub left_std_dev: f64,
    /// Right country's cycle standard deviation, in percent.
    pub right_std_dev: f64,
    /// Pearson correlation of the two cycles over their shared dates.
    pub correlation: f64,
    /// Number of dates both cycles observe.
    pub overlapping: usize,
}

/// Per-variable co-movement rows plus the variables it was undefined for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoMovementTable {
    pub left: String,
    pub right: String,
    pub rows: Vec<CoMovement>,
    #[serde(skip)]
    pub failures: Vec<VariableFailure>,
}

impl CoMovementTable {
    pub fn get(&self, variable: &str) -> Option<&CoMovement> {
        self.rows.iter().find(|r| r.variable == variable)
    }
}

/// Build the co-movement table for `variables` from both countries' cycles.
///
/// Variables without a cycle on either side are skipped; they already show
/// up as omissions and in the comparison table's excluded list.
pub fn build_co_movement(
    left_country: &str,
    left_cycles: &[(String, TimeSeries)],
    right_country: &str,
    right_cycles: &[(String, TimeSeries)],
    variables: &[String],
) -> CoMovementTable {
    let mut table = CoMovementTable {
        left: left_country.to_string(),
        right: right_country.to_string(),
        rows: Vec::new(),
        failures: Vec::new(),
    };

    for (i, variable) in variables.iter().enumerate() {
        if variables[..i].contains(variable) {
            continue;
        }
        let (Some(left), Some(right)) = (
            find_cycle(left_cycles, variable),
            find_cycle(right_cycles, variable),
        ) else {
            continue;
        };

        match co_movement(variable, left, right) {
            Ok(row) => table.rows.push(row),
            Err(error) => {
                tracing::warn!(
                    left = left_country,
                    right = right_country,
                    variable = %variable,
                    error = %error,
                    "Cross-country statistics undefined"
                );
                table.failures.push(VariableFailure {
                    variable: variable.clone(),
                    error,
                });
            }
        }
    }

    table
}

fn find_cycle<'a>(cycles: &'a [(String, TimeSeries)], variable: &str) -> Option<&'a TimeSeries> {
    cycles
        .iter()
        .find(|(name, _)| name == variable)
        .map(|(_, series)| series)
}

fn co_movement(
    variable: &str,
    left: &TimeSeries,
    right: &TimeSeries,
) -> Result<CoMovement, AnalysisError> {
    Ok(CoMovement {
        variable: variable.to_string(),
        left_std_dev: stats::sample_std_dev(&left.present_values())? * constants::PERCENT_SCALE,
        right_std_dev: stats::sample_std_dev(&right.present_values())? * constants::PERCENT_SCALE,
        correlation: stats::cross_country_correlation(left, right)?,
        overlapping: stats::inner_join(left, right).len(),
    })
}

impl fmt::Display for CoMovementTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimals = constants::TABLE_DECIMALS;
        let headers = [
            format!("Std {} (%)", self.left),
            format!("Std {} (%)", self.right),
            format!("Corr. {}-{}", self.left, self.right),
        ];
        let row_width = self
            .rows
            .iter()
            .map(|r| r.variable.len())
            .max()
            .unwrap_or(0)
            .max(8);
        let col_width = headers
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(decimals + 4);

        write!(f, "{:row_width$}", "")?;
        for header in &headers {
            write!(f, "  {header:>col_width$}")?;
        }
        writeln!(f)?;

        for row in &self.rows {
            writeln!(
                f,
                "{:<row_width$}  {:>col_width$.decimals$}  {:>col_width$.decimals$}  {:>col_width$.decimals$}",
                row.variable, row.left_std_dev, row.right_std_dev, row.correlation
            )?;
        }
        Ok(())
    }
}

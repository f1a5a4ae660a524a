// CycleScope - core/align.rs
//
// Series alignment: restrict a raw series to the analysis window, drop
// missing values, and flag calendar periods the declared frequency expects
// but the data does not contain.
// Core layer: pure logic, no I/O.

use crate::core::model::{DateRange, Frequency, Observation, TimeSeries};
use crate::util::error::AnalysisError;
use chrono::NaiveDate;

/// Output of [`align`]: a gap-checked series plus the periods it lacks.
#[derive(Debug, Clone)]
pub struct AlignedSeries {
    /// Observations inside the range with a usable value, re-tagged with
    /// the declared frequency.
    pub series: TimeSeries,

    /// Expected period dates strictly between retained observations that
    /// had no usable value (or no row at all).
    pub missing_periods: Vec<NaiveDate>,
}

impl AlignedSeries {
    pub fn has_gaps(&self) -> bool {
        !self.missing_periods.is_empty()
    }
}

/// Restrict `series` to `range` and exclude missing values.
///
/// Fails with `DataUnavailable` if nothing usable remains.
pub fn align(
    series: &TimeSeries,
    frequency: Frequency,
    range: &DateRange,
) -> Result<AlignedSeries, AnalysisError> {
    let retained: Vec<Observation> = series
        .present()
        .filter(|(date, _)| range.contains(*date))
        .map(|(date, value)| Observation::new(date, value))
        .collect();

    if retained.is_empty() {
        return Err(AnalysisError::DataUnavailable {
            start: range.start(),
            end: range.end(),
        });
    }

    let missing_periods = find_missing_periods(&retained, frequency);
    if !missing_periods.is_empty() {
        tracing::debug!(
            missing = missing_periods.len(),
            first = %missing_periods[0],
            "Series has gaps inside the analysis window"
        );
    }

    let series = TimeSeries::new(frequency, retained)?;
    Ok(AlignedSeries {
        series,
        missing_periods,
    })
}

/// Walk the frequency grid from each retained date to the next one and
/// collect every grid date that falls strictly in between.
fn find_missing_periods(retained: &[Observation], frequency: Frequency) -> Vec<NaiveDate> {
    let mut missing = Vec::new();
    for pair in retained.windows(2) {
        let mut expected = frequency.step(pair[0].date);
        while expected < pair[1].date {
            missing.push(expected);
            expected = frequency.step(expected);
        }
    }
    missing
}

// CycleScope - core/export.rs
//
// CSV and JSON export of comparison tables, per-country statistics and
// trend/cycle decompositions.
// Core layer: writes to any Write trait object; the caller opens files.

use crate::core::comparison::{CoMovementTable, ComparisonTable};
use crate::core::model::{CountryStatistics, Decomposition};
use crate::util::error::ExportError;
use std::io::Write;
use std::path::Path;

/// Export a comparison table to CSV in long form.
///
/// Writes: variable, metric, country, value. Returns the number of data rows.
pub fn export_comparison_csv<W: Write>(
    table: &ComparisonTable,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(["variable", "metric", "country", "value"])
        .map_err(csv_err)?;

    let mut count = 0;
    for (row, variable) in table.variables.iter().enumerate() {
        for column in &table.columns {
            csv_writer
                .write_record([
                    variable.as_str(),
                    column.metric.label(&table.reference).as_str(),
                    column.country.as_str(),
                    column.values[row].to_string().as_str(),
                ])
                .map_err(csv_err)?;
            count += 1;
        }
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export a comparison table as a pretty-printed JSON object.
pub fn export_comparison_json<W: Write>(
    table: &ComparisonTable,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, table).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(table.variables.len())
}

/// Export cross-country co-movement rows to CSV.
///
/// Writes: variable, left_std_dev, right_std_dev, correlation, overlapping
pub fn export_co_movement_csv<W: Write>(
    table: &CoMovementTable,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in &table.rows {
        csv_writer.serialize(row).map_err(|e| ExportError::Csv {
            path: export_path.to_path_buf(),
            source: e,
        })?;
    }
    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(table.rows.len())
}

/// Export cross-country co-movement as JSON (country labels plus rows).
pub fn export_co_movement_json<W: Write>(
    table: &CoMovementTable,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, table).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(table.rows.len())
}

/// Export one country's statistics to CSV.
///
/// Writes: variable, std_dev, autocorrelation_lag1, corr_with_reference, observations
pub fn export_statistics_csv<W: Write>(
    stats: &CountryStatistics,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in &stats.variables {
        csv_writer.serialize(record).map_err(|e| ExportError::Csv {
            path: export_path.to_path_buf(),
            source: e,
        })?;
    }
    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(stats.variables.len())
}

/// Export one country's statistics as JSON.
pub fn export_statistics_json<W: Write>(
    stats: &CountryStatistics,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, stats).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(stats.variables.len())
}

/// Export a decomposition to CSV.
///
/// Writes: date, observed, trend, cycle
pub fn export_decomposition_csv<W: Write>(
    decomposition: &Decomposition,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(["date", "observed", "trend", "cycle"])
        .map_err(csv_err)?;

    let mut count = 0;
    for (date, observed, trend, cycle) in decomposition.rows() {
        csv_writer
            .write_record([
                date.to_string(),
                observed.to_string(),
                trend.to_string(),
                cycle.to_string(),
            ])
            .map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

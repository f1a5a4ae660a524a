// CycleScope - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; every variant carries the values
// needed to explain the failure without re-running the computation.

use chrono::NaiveDate;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all CycleScope operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum CycleScopeError {
    /// Decomposition or statistics computation failed.
    Analysis(AnalysisError),

    /// A data source could not supply a series.
    Source(SourceError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for CycleScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis(e) => write!(f, "Analysis error: {e}"),
            Self::Source(e) => write!(f, "Data source error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for CycleScopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Analysis(e) => Some(e),
            Self::Source(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis errors
// ---------------------------------------------------------------------------

/// Errors raised by the numeric core (aligner, HP filter, statistics).
///
/// All of these are local to one variable: the pipeline records them as an
/// omission and carries on with the sibling variables.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// No usable observations in the requested range.
    DataUnavailable { start: NaiveDate, end: NaiveDate },

    /// Series is too short for the chosen algorithm.
    InsufficientData { required: usize, actual: usize },

    /// Too few overlapping points (or zero variance) for a statistic.
    UndefinedStatistic {
        statistic: &'static str,
        overlapping: usize,
    },

    /// The reference variable has no cycle to correlate against.
    MissingReference { reference: String },

    /// A log transform met a value that is not strictly positive.
    NonPositiveValue { date: NaiveDate, value: f64 },

    /// Observation dates are not strictly increasing.
    NonIncreasingTimestamps {
        previous: NaiveDate,
        current: NaiveDate,
    },

    /// Smoothing parameter is negative or not finite.
    InvalidLambda { value: f64 },

    /// Date range has its bounds reversed.
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// The banded solver hit a non-positive pivot (NaN or infinite input).
    NumericalBreakdown { index: usize },

    /// A comparison was asked to set a country against itself.
    IdenticalCountries { code: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataUnavailable { start, end } => {
                write!(f, "no observations available between {start} and {end}")
            }
            Self::InsufficientData { required, actual } => write!(
                f,
                "series has {actual} observations, at least {required} are required"
            ),
            Self::UndefinedStatistic {
                statistic,
                overlapping,
            } => write!(
                f,
                "{statistic} is undefined with {overlapping} usable observation(s)"
            ),
            Self::MissingReference { reference } => {
                write!(f, "reference variable '{reference}' has no cycle series")
            }
            Self::NonPositiveValue { date, value } => write!(
                f,
                "cannot take the logarithm of {value} at {date}: values must be strictly positive"
            ),
            Self::NonIncreasingTimestamps { previous, current } => write!(
                f,
                "timestamps must be strictly increasing: {current} follows {previous}"
            ),
            Self::InvalidLambda { value } => write!(
                f,
                "smoothing parameter lambda = {value} must be finite and non-negative"
            ),
            Self::InvalidDateRange { start, end } => {
                write!(f, "date range start {start} is after end {end}")
            }
            Self::NumericalBreakdown { index } => write!(
                f,
                "HP filter system became singular at row {index} (non-finite input?)"
            ),
            Self::IdenticalCountries { code } => {
                write!(f, "cannot compare country '{code}' with itself")
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<AnalysisError> for CycleScopeError {
    fn from(e: AnalysisError) -> Self {
        Self::Analysis(e)
    }
}

// ---------------------------------------------------------------------------
// Source errors
// ---------------------------------------------------------------------------

/// Errors related to fetching a series from a data source.
#[derive(Debug)]
pub enum SourceError {
    /// The country code has no definition in the registry or config.
    UnknownCountry { code: String },

    /// The country exists but has no series configured for this variable.
    VariableNotConfigured { country: String, variable: String },

    /// Series file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// CSV could not be read or decoded.
    Csv { path: PathBuf, source: csv::Error },

    /// A required column is absent from the CSV header.
    MissingColumn { path: PathBuf, column: String },

    /// A date cell could not be parsed.
    InvalidDate {
        path: PathBuf,
        row: usize,
        raw: String,
    },

    /// A value cell is neither a number nor a missing-value marker.
    InvalidValue {
        path: PathBuf,
        row: usize,
        raw: String,
    },

    /// The file parsed but its observations violate the series invariants.
    InvalidSeries {
        path: PathBuf,
        source: AnalysisError,
    },

    /// I/O error reading a series file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCountry { code } => {
                write!(f, "no data source is defined for country '{code}'")
            }
            Self::VariableNotConfigured { country, variable } => {
                write!(f, "country '{country}' has no series configured for '{variable}'")
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "'{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::Csv { path, source } => {
                write!(f, "CSV error in '{}': {source}", path.display())
            }
            Self::MissingColumn { path, column } => {
                write!(f, "'{}' has no column '{column}'", path.display())
            }
            Self::InvalidDate { path, row, raw } => write!(
                f,
                "'{}' row {row}: cannot parse date '{raw}'",
                path.display()
            ),
            Self::InvalidValue { path, row, raw } => write!(
                f,
                "'{}' row {row}: cannot parse value '{raw}'",
                path.display()
            ),
            Self::InvalidSeries { path, source } => {
                write!(f, "'{}': {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "I/O error reading '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source, .. } => Some(source),
            Self::InvalidSeries { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<SourceError> for CycleScopeError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The export path has an extension no writer handles.
    UnsupportedFormat { path: PathBuf },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
            Self::UnsupportedFormat { path } => write!(
                f,
                "Cannot export to '{}': use a .csv or .json extension",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::UnsupportedFormat { .. } => None,
        }
    }
}

impl From<ExportError> for CycleScopeError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for CycleScopeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for CycleScope results.
pub type Result<T> = std::result::Result<T, CycleScopeError>;

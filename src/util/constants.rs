// CycleScope - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "CycleScope";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "CycleScope";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// HP filter
// =============================================================================

/// Conventional smoothing parameter for quarterly data (Hodrick & Prescott, 1997).
pub const DEFAULT_LAMBDA_QUARTERLY: f64 = 1_600.0;

/// Conventional smoothing parameter for monthly data.
pub const DEFAULT_LAMBDA_MONTHLY: f64 = 14_400.0;

/// Conventional smoothing parameter for annual data.
pub const DEFAULT_LAMBDA_ANNUAL: f64 = 100.0;

/// Hard upper bound on a configured lambda. Beyond this the trend is
/// numerically indistinguishable from a straight line.
pub const MAX_LAMBDA: f64 = 1.0e9;

/// Minimum number of observations the second-difference penalty needs.
pub const MIN_HP_OBSERVATIONS: usize = 4;

// =============================================================================
// Statistics
// =============================================================================

/// Minimum number of overlapping pairs (or values) for a correlation,
/// autocorrelation, or standard deviation to be defined.
pub const MIN_STATISTIC_OBSERVATIONS: usize = 2;

/// Cycle standard deviations are reported in percent of trend.
pub const PERCENT_SCALE: f64 = 100.0;

/// Variance below this is treated as zero when normalising a correlation.
pub const VARIANCE_EPSILON: f64 = 1e-24;

/// Decimal places used when rendering the comparison table as text.
pub const TABLE_DECIMALS: usize = 3;

// =============================================================================
// Analysis defaults
// =============================================================================

/// Default first date of the analysis window (inclusive, ISO 8601).
pub const DEFAULT_START_DATE: &str = "1994-01-01";

/// Default last date of the analysis window (inclusive, ISO 8601).
pub const DEFAULT_END_DATE: &str = "2025-01-01";

/// Variable whose cycle every other cycle is correlated against.
pub const DEFAULT_REFERENCE_VARIABLE: &str = "gdp";

/// Variables analysed when the config does not list any.
pub const DEFAULT_VARIABLES: &[&str] = &["gdp", "consumption", "investment"];

// =============================================================================
// Data source limits
// =============================================================================

/// Default date column in FRED-style CSV downloads.
pub const DEFAULT_DATE_COLUMN: &str = "observation_date";

/// Date column used by older FRED CSV downloads.
pub const LEGACY_DATE_COLUMN: &str = "DATE";

/// Date format for CSV date cells.
pub const CSV_DATE_FORMAT: &str = "%Y-%m-%d";

/// Cell contents that denote a missing observation.
pub const MISSING_VALUE_MARKERS: &[&str] = &["", ".", "NaN", "nan", "NA", "#N/A"];

/// Maximum size of a single series CSV file.
pub const MAX_SERIES_FILE_SIZE: u64 = 16 * 1024 * 1024; // 16 MB

/// Maximum number of country definitions (built-in + user).
pub const MAX_COUNTRIES: usize = 250;

// =============================================================================
// Logging
// =============================================================================

/// Default log level when neither RUST_LOG, --debug, nor config set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// File names
// =============================================================================

/// Configuration file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Data directory name used when neither CLI nor config provide one.
pub const DATA_DIR_NAME: &str = "data";

// CycleScope - platform/config.rs
//
// Platform-specific configuration, data directory resolution, and
// config.toml loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::Frequency;
use crate::util::constants;
use crate::util::error::ConfigError;
use chrono::NaiveDate;
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolved platform paths for CycleScope configuration and data.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/cyclescope/).
    pub config_dir: PathBuf,

    /// Default directory for series CSV files.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().join(constants::DATA_DIR_NAME);

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                data_dir: fallback.join(constants::DATA_DIR_NAME),
                config_dir: fallback,
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[analysis]` section.
    pub analysis: AnalysisSection,
    /// `[data]` section.
    pub data: DataSection,
    /// `[countries.<CODE>]` tables.
    pub countries: BTreeMap<String, CountrySection>,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[analysis]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// HP smoothing parameter. Omitted = frequency's conventional value.
    pub lambda: Option<f64>,
    /// "monthly", "quarterly", or "annual".
    pub frequency: Option<String>,
    /// First date of the analysis window (YYYY-MM-DD).
    pub start: Option<String>,
    /// Last date of the analysis window (YYYY-MM-DD).
    pub end: Option<String>,
    /// Variable other cycles are correlated with.
    pub reference: Option<String>,
    /// Variables to analyse, in output order.
    pub variables: Option<Vec<String>>,
}

/// `[data]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory holding series CSV files.
    pub directory: Option<String>,
}

/// `[countries.<CODE>]` table. Shared with the built-in source registry.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct CountrySection {
    /// Display name used in tables ("Spain").
    pub name: Option<String>,
    /// Overrides `[analysis] frequency` for this country's files.
    pub frequency: Option<String>,
    /// Variable name -> series file.
    pub series: BTreeMap<String, SeriesSection>,
}

/// `[countries.<CODE>.series.<variable>]` table.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct SeriesSection {
    /// CSV file, relative to the data directory unless absolute.
    pub file: String,
    /// Value column; omitted = first non-date column.
    pub column: Option<String>,
    /// Date column; omitted = observation_date (or DATE).
    pub date_column: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Analysis --
    /// HP smoothing parameter.
    pub lambda: f64,
    /// True when `lambda` came from the user rather than the frequency default.
    pub lambda_explicit: bool,
    /// Declared sampling frequency.
    pub frequency: Frequency,
    /// Analysis window, inclusive.
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Reference variable for correlations.
    pub reference: String,
    /// Variables in output order.
    pub variables: Vec<String>,

    // -- Data --
    /// Series directory override.
    pub data_dir: Option<PathBuf>,
    /// User country definitions (override built-ins by code).
    pub countries: BTreeMap<String, CountrySection>,

    // -- Logging --
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            lambda: constants::DEFAULT_LAMBDA_QUARTERLY,
            lambda_explicit: false,
            frequency: Frequency::Quarterly,
            start: default_date(constants::DEFAULT_START_DATE),
            end: default_date(constants::DEFAULT_END_DATE),
            reference: constants::DEFAULT_REFERENCE_VARIABLE.to_string(),
            variables: constants::DEFAULT_VARIABLES
                .iter()
                .map(|v| v.to_string())
                .collect(),
            data_dir: None,
            countries: BTreeMap::new(),
            log_level: None,
        }
    }
}

fn default_date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, constants::CSV_DATE_FORMAT).unwrap_or_default()
}

/// Load and validate config.toml at `config_path`, tolerating a missing or
/// broken file.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    match load_config_strict(config_path) {
        Ok(result) => result,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            (AppConfig::default(), vec![msg])
        }
    }
}

/// Load a config file the user named explicitly. Unreadable or unparseable
/// files are errors; out-of-range values are still warnings.
pub fn load_config_strict(config_path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    let raw: RawConfig = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %config_path.display(), "Loaded config.toml");
    Ok(validate(raw))
}

/// Validate each field against named constants, accumulating all warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut config = AppConfig::default();

    // -- Analysis: frequency --
    if let Some(ref freq) = raw.analysis.frequency {
        match freq.parse::<Frequency>() {
            Ok(f) => config.frequency = f,
            Err(reason) => warnings.push(format!(
                "[analysis] frequency: {reason}. Using default ({}).",
                config.frequency
            )),
        }
    }
    config.lambda = config.frequency.default_lambda();

    // -- Analysis: lambda --
    if let Some(lambda) = raw.analysis.lambda {
        if lambda.is_finite() && (0.0..=constants::MAX_LAMBDA).contains(&lambda) {
            config.lambda = lambda;
            config.lambda_explicit = true;
        } else {
            warnings.push(format!(
                "[analysis] lambda = {lambda} is out of range (0-{}). Using default ({}).",
                constants::MAX_LAMBDA,
                config.lambda,
            ));
        }
    }

    // -- Analysis: start / end --
    let mut start = config.start;
    let mut end = config.end;
    if let Some(ref text) = raw.analysis.start {
        match NaiveDate::parse_from_str(text, constants::CSV_DATE_FORMAT) {
            Ok(d) => start = d,
            Err(e) => warnings.push(format!(
                "[analysis] start = \"{text}\" is not a YYYY-MM-DD date ({e}). Using default ({}).",
                config.start
            )),
        }
    }
    if let Some(ref text) = raw.analysis.end {
        match NaiveDate::parse_from_str(text, constants::CSV_DATE_FORMAT) {
            Ok(d) => end = d,
            Err(e) => warnings.push(format!(
                "[analysis] end = \"{text}\" is not a YYYY-MM-DD date ({e}). Using default ({}).",
                config.end
            )),
        }
    }
    if start <= end {
        config.start = start;
        config.end = end;
    } else {
        warnings.push(format!(
            "[analysis] start ({start}) is after end ({end}). Using default window ({} to {}).",
            config.start, config.end
        ));
    }

    // -- Analysis: reference --
    if let Some(ref reference) = raw.analysis.reference {
        let reference = reference.trim();
        if reference.is_empty() {
            warnings.push("[analysis] reference is empty. Using default (gdp).".to_string());
        } else {
            config.reference = reference.to_lowercase();
        }
    }

    // -- Analysis: variables --
    if let Some(variables) = raw.analysis.variables {
        let mut cleaned: Vec<String> = Vec::new();
        for v in variables {
            let v = v.trim().to_lowercase();
            if !v.is_empty() && !cleaned.contains(&v) {
                cleaned.push(v);
            }
        }
        if cleaned.is_empty() {
            warnings.push("[analysis] variables is empty. Using defaults.".to_string());
        } else {
            config.variables = cleaned;
        }
    }
    if !config.variables.contains(&config.reference) {
        warnings.push(format!(
            "[analysis] reference '{}' is not among the analysed variables; \
             correlations will be undefined.",
            config.reference
        ));
    }

    // -- Data: directory --
    if let Some(ref dir) = raw.data.directory {
        if !dir.is_empty() {
            config.data_dir = Some(PathBuf::from(dir));
        }
    }

    // -- Countries --
    if raw.countries.len() > constants::MAX_COUNTRIES {
        warnings.push(format!(
            "[countries] defines {} countries, maximum is {}. Extra entries ignored.",
            raw.countries.len(),
            constants::MAX_COUNTRIES
        ));
    }
    for (code, mut section) in raw.countries.into_iter().take(constants::MAX_COUNTRIES) {
        section.series.retain(|variable, series| {
            if series.file.trim().is_empty() {
                warnings.push(format!(
                    "[countries.{code}.series.{variable}] has no file. Entry ignored."
                ));
                false
            } else {
                true
            }
        });
        if let Some(ref freq) = section.frequency {
            if let Err(reason) = freq.parse::<Frequency>() {
                warnings.push(format!("[countries.{code}] frequency: {reason}. Entry ignored."));
                section.frequency = None;
            }
        }
        config.countries.insert(code.to_uppercase(), section);
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

// CycleScope - app/source.rs
//
// Data-source contract and its CSV implementation.
//
// A source answers "give me variable V for country C" with either a series
// or a typed absence. Absences are never turned into zeros or placeholders;
// the pipeline reports them as omissions.
//
// Country definitions come from a registry embedded in the binary, merged
// with [countries.<CODE>] tables from config.toml (user entries win).

use crate::core::model::{Frequency, Observation, TimeSeries};
use crate::platform::config::{CountrySection, SeriesSection};
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::SourceError;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Result of asking a source for one variable.
#[derive(Debug)]
pub enum VariableFetch {
    /// Raw (non-log) observations.
    Available(TimeSeries),
    /// The variable could not be supplied; the reason is kept for reporting.
    Absent(SourceError),
}

impl VariableFetch {
    pub fn into_result(self) -> Result<TimeSeries, SourceError> {
        match self {
            VariableFetch::Available(series) => Ok(series),
            VariableFetch::Absent(e) => Err(e),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, VariableFetch::Available(_))
    }
}

/// Supplies raw series per (country, variable).
///
/// `Sync` so a country's variables can be fetched from worker threads.
pub trait DataSource: Sync {
    /// Display label for a country code ("ES" -> "Spain").
    fn country_name(&self, country: &str) -> Result<String, SourceError>;

    /// Fetch one variable's raw series.
    fn fetch(&self, country: &str, variable: &str) -> VariableFetch;
}

// =============================================================================
// Country registry
// =============================================================================

/// Raw shape of the embedded registry file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RegistryFile {
    countries: BTreeMap<String, CountrySection>,
}

/// Resolved definition of one country's series files.
#[derive(Debug, Clone)]
pub struct CountryDefinition {
    pub code: String,
    pub name: String,
    pub frequency: Option<Frequency>,
    pub series: BTreeMap<String, SeriesSection>,
}

impl CountryDefinition {
    fn from_section(code: &str, section: &CountrySection) -> Self {
        Self {
            code: code.to_uppercase(),
            name: section.name.clone().unwrap_or_else(|| code.to_uppercase()),
            frequency: section.frequency.as_deref().and_then(|f| f.parse().ok()),
            series: section.series.clone(),
        }
    }

    /// Apply a user section on top: name and frequency replace, series
    /// entries replace per variable.
    fn merge(&mut self, section: &CountrySection) {
        if let Some(ref name) = section.name {
            self.name = name.clone();
        }
        if let Some(freq) = section.frequency.as_deref().and_then(|f| f.parse().ok()) {
            self.frequency = Some(freq);
        }
        for (variable, series) in &section.series {
            self.series.insert(variable.to_lowercase(), series.clone());
        }
    }
}

/// Load the registry embedded in the binary.
///
/// A malformed registry is a build defect; it is logged and yields no
/// countries rather than aborting the run.
pub fn load_builtin_countries() -> BTreeMap<String, CountryDefinition> {
    let content = include_str!("../../sources/countries.toml");
    match toml::from_str::<RegistryFile>(content) {
        Ok(file) => {
            let countries: BTreeMap<_, _> = file
                .countries
                .iter()
                .map(|(code, section)| {
                    (code.to_uppercase(), CountryDefinition::from_section(code, section))
                })
                .collect();
            tracing::debug!(count = countries.len(), "Loaded built-in country registry");
            countries
        }
        Err(e) => {
            tracing::error!(error = %e, "Built-in country registry is invalid");
            BTreeMap::new()
        }
    }
}

// =============================================================================
// CSV source
// =============================================================================

/// Reads FRED-style CSV files from a data directory.
#[derive(Debug, Clone)]
pub struct CsvSource {
    data_dir: PathBuf,
    default_frequency: Frequency,
    countries: BTreeMap<String, CountryDefinition>,
}

impl CsvSource {
    /// Source over `data_dir` with the built-in registry.
    pub fn new(data_dir: impl Into<PathBuf>, default_frequency: Frequency) -> Self {
        Self {
            data_dir: data_dir.into(),
            default_frequency,
            countries: load_builtin_countries(),
        }
    }

    /// Source with no registered countries (populate via `with_overrides`).
    pub fn empty(data_dir: impl Into<PathBuf>, default_frequency: Frequency) -> Self {
        Self {
            data_dir: data_dir.into(),
            default_frequency,
            countries: BTreeMap::new(),
        }
    }

    /// Merge user-defined country tables over the registry.
    pub fn with_overrides(mut self, user: &BTreeMap<String, CountrySection>) -> Self {
        for (code, section) in user {
            let code = code.to_uppercase();
            match self.countries.get_mut(&code) {
                Some(existing) => {
                    tracing::info!(country = %code, "User config overrides built-in country");
                    existing.merge(section);
                }
                None => {
                    tracing::info!(country = %code, "Loaded user-defined country");
                    self.countries
                        .insert(code.clone(), CountryDefinition::from_section(&code, section));
                }
            }
        }
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn countries(&self) -> impl Iterator<Item = &CountryDefinition> {
        self.countries.values()
    }

    pub fn country(&self, code: &str) -> Option<&CountryDefinition> {
        self.countries.get(&code.to_uppercase())
    }

    fn resolve_path(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    fn load(&self, country: &str, variable: &str) -> Result<TimeSeries, SourceError> {
        let definition = self
            .country(country)
            .ok_or_else(|| SourceError::UnknownCountry {
                code: country.to_string(),
            })?;
        let series = definition
            .series
            .get(variable)
            .ok_or_else(|| SourceError::VariableNotConfigured {
                country: definition.code.clone(),
                variable: variable.to_string(),
            })?;

        let path = self.resolve_path(&series.file);
        let frequency = definition.frequency.unwrap_or(self.default_frequency);
        let content = fs::read_file_capped(&path, constants::MAX_SERIES_FILE_SIZE)?;

        let parsed = parse_series_csv(
            &content,
            &path,
            series.date_column.as_deref(),
            series.column.as_deref(),
            frequency,
        )?;

        tracing::debug!(
            country = %definition.code,
            variable,
            path = %path.display(),
            observations = parsed.len(),
            "Series loaded"
        );
        Ok(parsed)
    }
}

impl DataSource for CsvSource {
    fn country_name(&self, country: &str) -> Result<String, SourceError> {
        self.country(country)
            .map(|c| c.name.clone())
            .ok_or_else(|| SourceError::UnknownCountry {
                code: country.to_string(),
            })
    }

    fn fetch(&self, country: &str, variable: &str) -> VariableFetch {
        match self.load(country, variable) {
            Ok(series) => VariableFetch::Available(series),
            Err(e) => VariableFetch::Absent(e),
        }
    }
}

/// Parse a FRED-style CSV into a series.
///
/// `date_column` defaults to `observation_date`, falling back to `DATE`.
/// `value_column` defaults to the first column that is not the date column.
/// Missing-value markers (".", empty, "NaN", ...) become explicit gaps.
pub fn parse_series_csv(
    content: &str,
    path: &Path,
    date_column: Option<&str>,
    value_column: Option<&str>,
    frequency: Frequency,
) -> Result<TimeSeries, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?
        .clone();

    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let date_idx = match date_column {
        Some(name) => find(name),
        None => find(constants::DEFAULT_DATE_COLUMN).or_else(|| find(constants::LEGACY_DATE_COLUMN)),
    }
    .ok_or_else(|| SourceError::MissingColumn {
        path: path.to_path_buf(),
        column: date_column
            .unwrap_or(constants::DEFAULT_DATE_COLUMN)
            .to_string(),
    })?;

    let value_idx = match value_column {
        Some(name) => find(name),
        None => (0..headers.len()).find(|&i| i != date_idx),
    }
    .ok_or_else(|| SourceError::MissingColumn {
        path: path.to_path_buf(),
        column: value_column.unwrap_or("<value>").to_string(),
    })?;

    let mut observations = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // Row numbers are 1-based and count the header line.
        let row = i + 2;
        let record = record.map_err(|e| SourceError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = NaiveDate::parse_from_str(raw_date, constants::CSV_DATE_FORMAT).map_err(|_| {
            SourceError::InvalidDate {
                path: path.to_path_buf(),
                row,
                raw: raw_date.to_string(),
            }
        })?;

        let raw_value = record.get(value_idx).unwrap_or("");
        let value = if constants::MISSING_VALUE_MARKERS.contains(&raw_value) {
            None
        } else {
            Some(
                raw_value
                    .parse::<f64>()
                    .map_err(|_| SourceError::InvalidValue {
                        path: path.to_path_buf(),
                        row,
                        raw: raw_value.to_string(),
                    })?,
            )
        };

        observations.push(Observation { date, value });
    }

    TimeSeries::new(frequency, observations).map_err(|e| SourceError::InvalidSeries {
        path: path.to_path_buf(),
        source: e,
    })
}

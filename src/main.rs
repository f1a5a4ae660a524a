// CycleScope - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and CLI overrides
// 3. Logging initialisation (debug mode support)
// 4. Running the country or two-country pipeline
// 5. Printing the result table and exporting files

use cyclescope::app::analysis::{self, AnalysisSettings, CountryAnalysis};
use cyclescope::app::source::CsvSource;
use cyclescope::core::comparison::{CoMovementTable, ComparisonTable};
use cyclescope::core::export;
use cyclescope::core::model::CountryStatistics;
use cyclescope::platform::config::{self, AppConfig, PlatformPaths};
use cyclescope::util::constants;
use cyclescope::util::error::{ConfigError, CycleScopeError, ExportError};
use cyclescope::util::logging;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// CycleScope - Hodrick-Prescott business-cycle analysis.
///
/// Decomposes GDP, consumption, and investment into trend and cycle, then
/// compares cycle volatility, persistence, and co-movement across countries.
#[derive(Parser, Debug)]
#[command(name = "cyclescope", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config.toml (defaults to the platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Directory containing series CSV files.
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// HP smoothing parameter (default depends on frequency; 1600 for quarterly).
    #[arg(short = 'l', long = "lambda", global = true)]
    lambda: Option<f64>,

    /// First date of the analysis window (YYYY-MM-DD).
    #[arg(long = "start", global = true)]
    start: Option<String>,

    /// Last date of the analysis window (YYYY-MM-DD).
    #[arg(long = "end", global = true)]
    end: Option<String>,

    /// Write the result table to this file (.csv or .json).
    #[arg(short = 'o', long = "export", global = true)]
    export: Option<PathBuf>,

    /// Write one date,observed,trend,cycle CSV per variable into this directory.
    #[arg(long = "cycles-dir", global = true)]
    cycles_dir: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare the business cycles of two countries (e.g. `compare ES US`).
    Compare {
        /// First country code.
        left: String,
        /// Second country code.
        right: String,
    },

    /// Decompose one country's series and report its cycle statistics.
    Decompose {
        /// Country code.
        country: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();

    // Load config before logging so [logging] level can take effect; the
    // warnings are reported once the subscriber is up.
    let loaded = match cli.config {
        Some(ref path) => config::load_config_strict(path),
        None => Ok(config::load_config(&platform_paths.config_file())),
    };

    let (mut app_config, config_warnings) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            logging::init(cli.debug, None);
            tracing::error!(error = %e, "Failed to load configuration");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "CycleScope starting"
    );
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    match run(&cli, &mut app_config, &platform_paths) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    cli: &Cli,
    app_config: &mut AppConfig,
    platform_paths: &PlatformPaths,
) -> Result<ExitCode, CycleScopeError> {
    apply_overrides(cli, app_config)?;

    let settings = AnalysisSettings::from_config(app_config)?;

    // Data directory: CLI > config > platform default.
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| app_config.data_dir.clone())
        .unwrap_or_else(|| platform_paths.data_dir.clone());

    tracing::info!(
        data_dir = %data_dir.display(),
        lambda = ?settings.lambda,
        start = %settings.range.start(),
        end = %settings.range.end(),
        "Analysis settings resolved"
    );

    let source =
        CsvSource::new(data_dir, app_config.frequency).with_overrides(&app_config.countries);

    match &cli.command {
        Command::Compare { left, right } => {
            let result = analysis::compare_countries(&source, left, right, &settings)?;

            report_omissions(&result.left);
            report_omissions(&result.right);

            if !result.left.has_usable_series() && !result.right.has_usable_series() {
                eprintln!("Error: no usable series for either country");
                return Ok(ExitCode::FAILURE);
            }

            println!("\nBusiness Cycle Statistics:\n");
            print!("{}", result.table);
            if !result.table.excluded.is_empty() {
                println!(
                    "\n(not available for both countries: {})",
                    result.table.excluded.join(", ")
                );
            }

            println!("\nCross-Country Co-movement:\n");
            print!("{}", result.co_movement);
            for failure in &result.co_movement.failures {
                eprintln!(
                    "Warning: {} vs {}: '{}' co-movement omitted: {}",
                    result.left.name, result.right.name, failure.variable, failure.error
                );
            }

            if let Some(ref path) = cli.export {
                export_table(&result.table, path)?;
                export_co_movement(&result.co_movement, &co_movement_path(path))?;
            }
            if let Some(ref dir) = cli.cycles_dir {
                export_cycles(&result.left, dir)?;
                export_cycles(&result.right, dir)?;
            }
        }
        Command::Decompose { country } => {
            let result = analysis::analyze_country(&source, country, &settings)?;

            report_omissions(&result);

            if !result.has_usable_series() {
                eprintln!("Error: no usable series for {}", result.name);
                return Ok(ExitCode::FAILURE);
            }

            println!("\nBusiness Cycle Statistics: {}\n", result.name);
            print_statistics(&result.statistics, &settings.reference);

            if let Some(ref path) = cli.export {
                export_statistics(&result.statistics, path)?;
            }
            if let Some(ref dir) = cli.cycles_dir {
                export_cycles(&result, dir)?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// CLI values win over config.toml; they are validated the same way.
fn apply_overrides(cli: &Cli, app_config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(lambda) = cli.lambda {
        if !lambda.is_finite() || !(0.0..=constants::MAX_LAMBDA).contains(&lambda) {
            return Err(ConfigError::ValueOutOfRange {
                field: "--lambda".to_string(),
                value: lambda.to_string(),
                expected: format!("0 to {}", constants::MAX_LAMBDA),
            });
        }
        app_config.lambda = lambda;
        app_config.lambda_explicit = true;
    }
    if let Some(ref start) = cli.start {
        app_config.start = parse_date_arg("--start", start)?;
    }
    if let Some(ref end) = cli.end {
        app_config.end = parse_date_arg("--end", end)?;
    }
    Ok(())
}

fn parse_date_arg(field: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, constants::CSV_DATE_FORMAT).map_err(|_| {
        ConfigError::ValueOutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            expected: "a YYYY-MM-DD date".to_string(),
        }
    })
}

fn report_omissions(country: &CountryAnalysis) {
    for omission in &country.omissions {
        eprintln!("Warning: {}: {omission}", country.name);
    }
    for variable in &country.variables {
        if !variable.missing_periods.is_empty() {
            eprintln!(
                "Warning: {}: '{}' has {} missing period(s) inside the window, first at {}",
                country.name,
                variable.variable,
                variable.missing_periods.len(),
                variable.missing_periods[0]
            );
        }
    }
}

fn print_statistics(stats: &CountryStatistics, reference: &str) {
    let decimals = constants::TABLE_DECIMALS;
    let corr_label = format!("Corr. with {}", reference.to_uppercase());
    println!(
        "{:<12}  {:>14}  {:>12}  {:>14}",
        "", "Volatility (%)", "Persistence", corr_label
    );
    for v in &stats.variables {
        println!(
            "{:<12}  {:>14.decimals$}  {:>12.decimals$}  {:>14.decimals$}",
            v.variable, v.std_dev, v.autocorrelation_lag1, v.corr_with_reference
        );
    }
}

fn create_export_file(path: &Path) -> Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ExportError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

fn export_table(table: &ComparisonTable, path: &Path) -> Result<(), ExportError> {
    let rows = match extension(path).as_str() {
        "csv" => export::export_comparison_csv(table, create_export_file(path)?, path)?,
        "json" => export::export_comparison_json(table, create_export_file(path)?, path)?,
        _ => {
            return Err(ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    tracing::info!(path = %path.display(), rows, "Comparison table exported");
    Ok(())
}

/// `table.csv` -> `table_comovement.csv`, next to the main export.
fn co_movement_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("comparison");
    let file_name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_comovement.{ext}"),
        None => format!("{stem}_comovement"),
    };
    path.with_file_name(file_name)
}

fn export_co_movement(table: &CoMovementTable, path: &Path) -> Result<(), ExportError> {
    let rows = match extension(path).as_str() {
        "csv" => export::export_co_movement_csv(table, create_export_file(path)?, path)?,
        "json" => export::export_co_movement_json(table, create_export_file(path)?, path)?,
        _ => {
            return Err(ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    tracing::info!(path = %path.display(), rows, "Co-movement table exported");
    Ok(())
}

fn export_statistics(stats: &CountryStatistics, path: &Path) -> Result<(), ExportError> {
    let rows = match extension(path).as_str() {
        "csv" => export::export_statistics_csv(stats, create_export_file(path)?, path)?,
        "json" => export::export_statistics_json(stats, create_export_file(path)?, path)?,
        _ => {
            return Err(ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    tracing::info!(path = %path.display(), rows, "Statistics exported");
    Ok(())
}

fn export_cycles(country: &CountryAnalysis, dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for variable in &country.variables {
        let path = dir.join(format!(
            "{}_{}_decomposition.csv",
            country.code.to_lowercase(),
            variable.variable
        ));
        let rows = export::export_decomposition_csv(
            &variable.decomposition,
            create_export_file(&path)?,
            &path,
        )?;
        tracing::debug!(path = %path.display(), rows, "Decomposition exported");
    }
    Ok(())
}

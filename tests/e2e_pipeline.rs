// CycleScope - tests/e2e_pipeline.rs
//
// End-to-end tests for the business-cycle pipeline.
//
// These tests write real FRED-style CSV files to a temporary directory and
// run the real CSV source, aligner, log transform, HP filter, statistics
// engine and comparison builder. No mocks, no stubs.

use cyclescope::app::analysis::{analyze_country, compare_countries, AnalysisSettings, Stage};
use cyclescope::app::source::CsvSource;
use cyclescope::core::export::export_comparison_csv;
use cyclescope::core::model::{DateRange, Frequency, Metric};
use cyclescope::platform::config::{self, CountrySection, SeriesSection};
use cyclescope::util::error::{AnalysisError, CycleScopeError};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::Path;

// =============================================================================
// Helpers
// =============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Write a quarterly level series exp(log_value(t)) as a FRED CSV.
fn write_series(dir: &Path, file: &str, column: &str, n: usize, log_value: impl Fn(f64) -> f64) {
    write_series_at(dir, file, column, Frequency::Quarterly, n, log_value);
}

fn write_series_at(
    dir: &Path,
    file: &str,
    column: &str,
    frequency: Frequency,
    n: usize,
    log_value: impl Fn(f64) -> f64,
) {
    let mut text = format!("observation_date,{column}\n");
    let mut d = date(1995, 1, 1);
    for t in 0..n {
        text.push_str(&format!("{d},{}\n", log_value(t as f64).exp()));
        d = frequency.step(d);
    }
    std::fs::write(dir.join(file), text).unwrap();
}

fn country(name: &str, series: &[(&str, &str, &str)]) -> CountrySection {
    let mut map = BTreeMap::new();
    for (variable, file, column) in series {
        map.insert(
            variable.to_string(),
            SeriesSection {
                file: file.to_string(),
                column: Some(column.to_string()),
                date_column: None,
            },
        );
    }
    CountrySection {
        name: Some(name.to_string()),
        frequency: Some("quarterly".to_string()),
        series: map,
    }
}

fn settings() -> AnalysisSettings {
    AnalysisSettings {
        lambda: Some(1600.0),
        range: DateRange::new(date(1995, 1, 1), date(2025, 1, 1)).unwrap(),
        reference: "gdp".to_string(),
        variables: vec![
            "gdp".to_string(),
            "consumption".to_string(),
            "investment".to_string(),
        ],
    }
}

// =============================================================================
// Scenarios
// =============================================================================

/// 40 quarters of log GDP = linear trend + 4-period cycle of amplitude 0.02.
/// The recovered cycle amplitude and trend slope match what was injected.
#[test]
fn e2e_recovers_injected_cycle_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let slope = 0.006;
    let amplitude = 0.02;
    write_series(dir.path(), "gdp.csv", "GDP", 40, |t| {
        9.5 + slope * t + amplitude * (PI / 2.0 * t).sin()
    });

    let mut user = BTreeMap::new();
    user.insert("XX".to_string(), country("Testland", &[("gdp", "gdp.csv", "GDP")]));
    let source = CsvSource::empty(dir.path(), Frequency::Quarterly).with_overrides(&user);

    let mut s = settings();
    s.variables = vec!["gdp".to_string()];
    let analysis = analyze_country(&source, "XX", &s).unwrap();
    assert!(analysis.omissions.is_empty(), "{:?}", analysis.omissions);

    let d = analysis.decomposition("gdp").unwrap();
    assert_eq!(d.len(), 40);

    // trend + cycle reproduces the log input.
    for (i, (_, observed, trend, cycle)) in d.rows().enumerate() {
        let expected = 9.5 + slope * i as f64 + amplitude * (PI / 2.0 * i as f64).sin();
        assert!((observed - expected).abs() < 1e-9);
        assert!(((trend + cycle) - observed).abs() <= 1e-9 * observed.abs());
    }

    let cycle = d.cycle.present_values();
    let rms = (cycle.iter().map(|c| c * c).sum::<f64>() / cycle.len() as f64).sqrt();
    let recovered_amplitude = rms * 2f64.sqrt();
    assert!(
        (recovered_amplitude - amplitude).abs() / amplitude < 0.10,
        "amplitude {recovered_amplitude}"
    );

    let trend = d.trend.present_values();
    let n = trend.len() as f64;
    let t_mean = (n - 1.0) / 2.0;
    let y_mean = trend.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (t, v) in trend.iter().enumerate() {
        sxy += (t as f64 - t_mean) * (v - y_mean);
        sxx += (t as f64 - t_mean).powi(2);
    }
    let recovered_slope = sxy / sxx;
    assert!(
        (recovered_slope - slope).abs() / slope < 0.05,
        "slope {recovered_slope}"
    );

    // Volatility is reported in percent of trend.
    let gdp = analysis.statistics.get("gdp").unwrap();
    assert!((gdp.std_dev - rms * 100.0).abs() < 0.2 * rms * 100.0);
}

/// Two countries sharing only gdp and investment: the table holds exactly
/// those two variables for both countries, and consumption is reported as
/// an omission rather than silently zeroed.
#[test]
fn e2e_comparison_uses_shared_variables_only() {
    let dir = tempfile::tempdir().unwrap();
    let cyc = |amp: f64, period: f64| move |t: f64| amp * (2.0 * PI * t / period).sin();

    let (g, c, i) = (cyc(0.015, 20.0), cyc(0.01, 20.0), cyc(0.05, 20.0));
    write_series(dir.path(), "a_gdp.csv", "A_GDP", 80, move |t| 10.0 + 0.005 * t + g(t));
    write_series(dir.path(), "a_cons.csv", "A_C", 80, move |t| 9.0 + 0.004 * t + c(t));
    write_series(dir.path(), "a_inv.csv", "A_I", 80, move |t| 8.0 + 0.007 * t + i(t));

    let (g, i) = (cyc(0.01, 16.0), cyc(0.04, 16.0));
    write_series(dir.path(), "b_gdp.csv", "B_GDP", 80, move |t| 11.0 + 0.002 * t + g(t));
    write_series(dir.path(), "b_inv.csv", "B_I", 80, move |t| 9.5 + 0.001 * t + i(t));

    let mut user = BTreeMap::new();
    user.insert(
        "AA".to_string(),
        country(
            "Alpha",
            &[
                ("gdp", "a_gdp.csv", "A_GDP"),
                ("consumption", "a_cons.csv", "A_C"),
                ("investment", "a_inv.csv", "A_I"),
            ],
        ),
    );
    user.insert(
        "BB".to_string(),
        country(
            "Beta",
            &[
                ("gdp", "b_gdp.csv", "B_GDP"),
                ("investment", "b_inv.csv", "B_I"),
            ],
        ),
    );
    let source = CsvSource::empty(dir.path(), Frequency::Quarterly).with_overrides(&user);

    let result = compare_countries(&source, "AA", "BB", &settings()).unwrap();

    assert_eq!(result.table.variables, vec!["gdp", "investment"]);
    assert_eq!(result.table.countries, vec!["Alpha", "Beta"]);
    for metric in Metric::all() {
        for name in ["Alpha", "Beta"] {
            let column = result.table.column(*metric, name).unwrap();
            assert_eq!(column.values.len(), 2);
        }
    }

    // Cross-country co-movement covers the same shared variables.
    let shared: Vec<_> = result.co_movement.rows.iter().map(|r| r.variable.as_str()).collect();
    assert_eq!(shared, vec!["gdp", "investment"]);
    let investment = result.co_movement.get("investment").unwrap();
    assert_eq!(investment.overlapping, 80);
    assert!(investment.left_std_dev > investment.right_std_dev);

    assert!(result.left.omissions.is_empty());
    assert_eq!(result.right.omissions.len(), 1);
    assert_eq!(result.right.omissions[0].variable, "consumption");
    assert_eq!(result.right.omissions[0].stage, Stage::Fetch);

    // Investment cycles are several times more volatile than GDP cycles.
    let alpha_gdp = result.table.value(Metric::Volatility, "Alpha", "gdp").unwrap();
    let alpha_inv = result.table.value(Metric::Volatility, "Alpha", "investment").unwrap();
    assert!(alpha_inv > 2.0 * alpha_gdp);

    let mut buf = Vec::new();
    let rows = export_comparison_csv(&result.table, &mut buf, Path::new("t.csv")).unwrap();
    assert_eq!(rows, 12);
}

/// A window with no observations yields DataUnavailable for every variable,
/// reported per variable, and the country has no usable series.
#[test]
fn e2e_empty_window_reports_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    write_series(dir.path(), "gdp.csv", "GDP", 20, |t| 10.0 + 0.01 * t);

    let mut user = BTreeMap::new();
    user.insert("XX".to_string(), country("Testland", &[("gdp", "gdp.csv", "GDP")]));
    let source = CsvSource::empty(dir.path(), Frequency::Quarterly).with_overrides(&user);

    let mut s = settings();
    s.range = DateRange::new(date(2030, 1, 1), date(2035, 1, 1)).unwrap();
    s.variables = vec!["gdp".to_string()];

    let analysis = analyze_country(&source, "XX", &s).unwrap();
    assert!(!analysis.has_usable_series());
    assert_eq!(analysis.omissions.len(), 1);
    assert_eq!(analysis.omissions[0].stage, Stage::Align);
    assert!(matches!(
        analysis.omissions[0].error,
        CycleScopeError::Analysis(AnalysisError::DataUnavailable { .. })
    ));
}

/// A config file drives the whole run: window, lambda, and a user country.
#[test]
fn e2e_config_file_feeds_settings_and_source() {
    let dir = tempfile::tempdir().unwrap();
    write_series(dir.path(), "es_gdp.csv", "CLVMNACSCAB1GQES", 60, |t| {
        12.0 + 0.004 * t + 0.02 * (2.0 * PI * t / 24.0).sin()
    });

    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
            [analysis]
            lambda = 1600.0
            start = "2000-01-01"
            end = "2009-10-01"
            variables = ["gdp"]

            [data]
            directory = "{}"

            [countries.ES.series.gdp]
            file = "es_gdp.csv"
            "#,
            dir.path().display().to_string().replace('\\', "\\\\")
        ),
    )
    .unwrap();

    let (app_config, warnings) = config::load_config_strict(&config_path).unwrap();
    assert!(warnings.is_empty(), "{warnings:?}");

    let settings = AnalysisSettings::from_config(&app_config).unwrap();
    let source = CsvSource::new(app_config.data_dir.clone().unwrap(), app_config.frequency)
        .with_overrides(&app_config.countries);

    let analysis = analyze_country(&source, "ES", &settings).unwrap();
    assert_eq!(analysis.name, "Spain");
    // 2000Q1..2009Q4 inclusive.
    assert_eq!(analysis.decomposition("gdp").unwrap().len(), 40);
    assert!(analysis.omissions.is_empty(), "{:?}", analysis.omissions);
}

/// A country declared monthly keeps its monthly grid under quarterly
/// defaults: lag-1 pairs are one month apart and λ is the monthly value.
#[test]
fn e2e_country_frequency_reaches_the_analysis() {
    let dir = tempfile::tempdir().unwrap();
    write_series_at(dir.path(), "m_gdp.csv", "M_GDP", Frequency::Monthly, 240, |t| {
        8.0 + 0.002 * t + 0.03 * (2.0 * PI * t / 12.0).sin()
    });

    let mut section = country("Monthland", &[("gdp", "m_gdp.csv", "M_GDP")]);
    section.frequency = Some("monthly".to_string());
    let mut user = BTreeMap::new();
    user.insert("MM".to_string(), section);
    let source = CsvSource::empty(dir.path(), Frequency::Quarterly).with_overrides(&user);

    let mut s = settings();
    s.lambda = None;
    s.variables = vec!["gdp".to_string()];

    let analysis = analyze_country(&source, "MM", &s).unwrap();
    assert!(analysis.omissions.is_empty(), "{:?}", analysis.omissions);

    let d = analysis.decomposition("gdp").unwrap();
    assert_eq!(d.len(), 240);
    assert_eq!(d.lambda, 14_400.0);
    assert_eq!(d.cycle.frequency(), Frequency::Monthly);

    let rho = analysis.statistics.get("gdp").unwrap().autocorrelation_lag1;
    let expected = (2.0 * PI / 12.0).cos();
    assert!((rho - expected).abs() < 0.03, "rho {rho}, expected {expected}");
}

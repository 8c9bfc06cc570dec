//! The full ingest → normalize → aggregate → plot workflow.
//!
//! One run processes all four sources in a fixed order (local JHU
//! time-series, local JHU daily reports, remote cantonal CSV, remote
//! case-line + population CSVs), builds the six chart specs and renders
//! each as PNG and SVG. Sources are independent; their outputs only meet
//! again in the run summary.

use std::path::PathBuf;

use crate::data::HttpSource;
use crate::domain::{CountKind, Metric, RunConfig};
use crate::error::AppError;
use crate::fit::{ExpFit, fit_exponential};
use crate::io::{cantonal, caseline, daily, global};
use crate::plot::{charts, render};
use crate::report::RunSummary;
use crate::series::{TimeSeries, build_series, case_fatality_rate, peak};

/// Entity label for the national case-line charts.
const CASELINE_ENTITY: &str = "CH";

/// Execute the whole pipeline and return the run summary.
pub fn run_pipeline(config: &RunConfig) -> Result<RunSummary, AppError> {
    std::fs::create_dir_all(&config.out_dir).map_err(|e| {
        AppError::render(format!(
            "Failed to create output directory '{}': {e}",
            config.out_dir.display()
        ))
    })?;

    let mut files: Vec<PathBuf> = Vec::new();
    let mut summary = RunSummary::new(&config.canton, &config.country);

    run_global_stage(config, &mut summary, &mut files)?;
    run_daily_stage(config, &mut summary, &mut files)?;

    let http = HttpSource::new()?;
    run_cantonal_stage(config, &http, &mut summary, &mut files)?;
    run_caseline_stage(config, &http, &mut summary, &mut files)?;

    summary.files = files;
    Ok(summary)
}

/// Stage 1: cumulative Confirmed/Recovered/Deaths from the global
/// wide time-series files.
fn run_global_stage(
    config: &RunConfig,
    summary: &mut RunSummary,
    files: &mut Vec<PathBuf>,
) -> Result<(), AppError> {
    let metrics = [Metric::Confirmed, Metric::Recovered, Metric::Deaths];
    let mut series: Vec<TimeSeries> = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let observations = global::load_global_series(&config.timeseries_dir, metric)?;
        let ts = build_series(&observations, &config.country, metric, CountKind::Cumulative);
        // The wide files carry every country; the summary counts only the
        // requested one, like the other source counters.
        summary.global_observations += ts.len();
        series.push(ts);
    }

    let refs: Vec<&TimeSeries> = series.iter().collect();
    let Some(spec) = charts::cumulative_chart(&config.country, &refs) else {
        return Err(AppError::no_data(format!(
            "No time-series data for '{}'.",
            config.country
        )));
    };
    files.extend(render::render_date_chart(&spec, &config.out_dir)?);
    Ok(())
}

/// Stage 2: daily deltas, peak deaths and case-fatality rate from the
/// per-day report files.
fn run_daily_stage(
    config: &RunConfig,
    summary: &mut RunSummary,
    files: &mut Vec<PathBuf>,
) -> Result<(), AppError> {
    let observations = daily::load_daily_reports(&config.daily_reports_dir, &config.country)?;
    summary.daily_observations = observations.len();
    if observations.is_empty() {
        return Err(AppError::no_data(format!(
            "No daily-report rows for '{}' under '{}'.",
            config.country,
            config.daily_reports_dir.display()
        )));
    }

    let confirmed = build_series(
        &observations,
        &config.country,
        Metric::Confirmed,
        CountKind::Cumulative,
    );
    let deaths = build_series(
        &observations,
        &config.country,
        Metric::Deaths,
        CountKind::Cumulative,
    );

    let confirmed_delta = confirmed.delta();
    let deaths_delta = deaths.delta();
    let peak_deaths = peak(&deaths_delta);
    let cfr = case_fatality_rate(&confirmed, &deaths);

    summary.daily_cfr = cfr;
    summary.peak_daily_deaths = peak_deaths;

    let Some(spec) =
        charts::daily_chart(&config.country, &confirmed_delta, &deaths_delta, cfr, peak_deaths)
    else {
        return Err(AppError::no_data(format!(
            "Daily-report data for '{}' has no plottable deltas.",
            config.country
        )));
    };
    files.extend(render::render_date_chart(&spec, &config.out_dir)?);
    Ok(())
}

/// Stage 3: cantonal daily chart from the remote openZH-layout CSV.
fn run_cantonal_stage(
    config: &RunConfig,
    http: &HttpSource,
    summary: &mut RunSummary,
    files: &mut Vec<PathBuf>,
) -> Result<(), AppError> {
    let body = http.fetch_text(&config.cantonal_url)?;
    let observations =
        cantonal::normalize_cantonal(body.as_bytes(), &config.canton, &config.cantonal_url)?;
    summary.cantonal_observations = observations.len();
    if observations.is_empty() {
        return Err(AppError::no_data(format!(
            "No cantonal rows for '{}' in '{}'.",
            config.canton, config.cantonal_url
        )));
    }

    let make = |metric| build_series(&observations, &config.canton, metric, CountKind::Cumulative);
    let confirmed = make(Metric::Confirmed);
    let deaths = make(Metric::Deaths);
    // Hospitalization and ventilator columns are already level values.
    let hospitalized = make(Metric::Hospitalized);
    let ventilated = make(Metric::Ventilated);

    let cfr = case_fatality_rate(&confirmed, &deaths);
    summary.cantonal_cfr = cfr;

    let Some(spec) = charts::cantonal_chart(
        &config.canton,
        &confirmed.delta(),
        &hospitalized,
        &ventilated,
        &deaths.delta(),
        cfr,
    ) else {
        return Err(AppError::no_data(format!(
            "Cantonal data for '{}' has no plottable series.",
            config.canton
        )));
    };
    files.extend(render::render_date_chart(&spec, &config.out_dir)?);
    Ok(())
}

/// Stage 4: national case-line charts — daily bars, per-capita age
/// rates, and the exponential mortality fit.
fn run_caseline_stage(
    config: &RunConfig,
    http: &HttpSource,
    summary: &mut RunSummary,
    files: &mut Vec<PathBuf>,
) -> Result<(), AppError> {
    let body = http.fetch_text(&config.caseline_url)?;
    let data = caseline::read_case_lines(body.as_bytes(), &config.caseline_url)?;
    summary.caseline_records = data.records.len();
    summary.caseline_skipped_rows = data.skipped_rows;

    let observations = caseline::normalize_case_lines(&data.records, CASELINE_ENTITY);
    let confirmed = build_series(
        &observations,
        CASELINE_ENTITY,
        Metric::Confirmed,
        CountKind::Incremental,
    );
    let deaths = build_series(
        &observations,
        CASELINE_ENTITY,
        Metric::Deaths,
        CountKind::Incremental,
    );

    if let Some(spec) =
        charts::caseline_chart(CASELINE_ENTITY, &confirmed.delta(), &deaths.delta())
    {
        files.extend(render::render_date_chart(&spec, &config.out_dir)?);
    }

    let population_body = http.fetch_text(&config.population_url)?;
    let population = caseline::read_population(population_body.as_bytes(), &config.population_url)?;
    let table = caseline::build_age_table(&data.records, &population);

    let rates_spec = charts::age_rates_chart(CASELINE_ENTITY, &table);
    files.extend(render::render_age_chart(&rates_spec, &config.out_dir)?);

    // A failed fit is a summary note and a curve-less chart, not an abort.
    let fit = fit_age_mortality(&table);
    summary.mortality_fit = fit;
    let fit_spec = charts::age_fit_chart(CASELINE_ENTITY, &table, summary.mortality_fit.as_ref());
    files.extend(render::render_age_chart(&fit_spec, &config.out_dir)?);
    Ok(())
}

fn fit_age_mortality(table: &crate::domain::AgeStratifiedTable) -> Option<ExpFit> {
    let (x, y): (Vec<f64>, Vec<f64>) = table.death_counts().into_iter().unzip();
    fit_exponential(&x, &y).ok()
}
